use async_trait::async_trait;
use chrono::{DateTime, Utc};
use es_core::{
    ArticleCandidate, ArticleId, ArticleStorage, CatalogStorage, DiseaseCaseRecord, Error, Keyword,
    OverviewStats, Result, StoredArticle, Tag, TrendPoint, WhitelistDomain,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{StorageBackend, StorageConfig};

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<StoredArticle>,
    cases: Vec<DiseaseCaseRecord>,
    keywords: Vec<Keyword>,
    whitelist: Vec<WhitelistDomain>,
    next_article_id: ArticleId,
    next_keyword_id: i64,
    next_whitelist_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains_link(&self, link: &str) -> bool {
        self.articles.iter().any(|a| a.article.link == link)
    }

    pub fn store_article(&mut self, candidate: &ArticleCandidate) -> Result<ArticleId> {
        if self.contains_link(&candidate.link) {
            return Err(Error::AlreadyExists(format!("Article already saved: {}", candidate.link)));
        }
        self.next_article_id += 1;
        let id = self.next_article_id;
        self.articles.push(StoredArticle {
            id,
            article: candidate.clone(),
        });
        Ok(id)
    }

    pub fn store_case(&mut self, record: &DiseaseCaseRecord) -> Result<()> {
        if !self.articles.iter().any(|a| a.id == record.article_id) {
            return Err(Error::NotFound(format!("Article {} not found", record.article_id)));
        }
        self.cases.push(record.clone());
        Ok(())
    }

    pub fn add_keyword(&mut self, text: &str) -> Result<Keyword> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Config("Keyword must not be empty".to_string()));
        }
        if self.keywords.iter().any(|k| k.text == text) {
            return Err(Error::AlreadyExists(format!("Keyword already exists: {}", text)));
        }
        self.next_keyword_id += 1;
        let keyword = Keyword {
            id: self.next_keyword_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.keywords.push(keyword.clone());
        Ok(keyword)
    }

    pub fn remove_keyword(&mut self, id: i64) -> Result<()> {
        let before = self.keywords.len();
        self.keywords.retain(|k| k.id != id);
        if self.keywords.len() == before {
            return Err(Error::NotFound(format!("Keyword {} not found", id)));
        }
        Ok(())
    }

    pub fn add_whitelist_domain(&mut self, domain: &str, is_active: bool) -> Result<WhitelistDomain> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(Error::Config("Domain must not be empty".to_string()));
        }
        if self.whitelist.iter().any(|w| w.domain == domain) {
            return Err(Error::AlreadyExists(format!("Domain already whitelisted: {}", domain)));
        }
        self.next_whitelist_id += 1;
        let entry = WhitelistDomain {
            id: self.next_whitelist_id,
            domain,
            is_active,
        };
        self.whitelist.push(entry.clone());
        Ok(entry)
    }

    fn keywords_newest_first(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter().rev()
    }

    pub fn overview(&self, now: DateTime<Utc>) -> OverviewStats {
        OverviewStats {
            total_articles: self.articles.len() as u64,
            total_cases: self.cases.iter().fold(0u64, |sum, c| sum.saturating_add(c.case_count)),
            alert_count: self.articles.iter().filter(|a| a.article.has_tag(Tag::Alert)).count() as u64,
            last_updated: now,
        }
    }

    pub fn trend(&self, since: DateTime<Utc>) -> Vec<TrendPoint> {
        let mut by_day: BTreeMap<String, u64> = BTreeMap::new();
        for case in self.cases.iter().filter(|c| c.report_date >= since) {
            let total = by_day.entry(case.report_date.format("%Y-%m-%d").to_string()).or_default();
            *total = total.saturating_add(case.case_count);
        }
        by_day.into_iter().map(|(date, cases)| TrendPoint { date, cases }).collect()
    }
}

/// Process-local storage. Contents are lost on exit.
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_config: &StorageConfig) -> Result<Self> where Self: Sized {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn article_exists_by_link(&self, link: &str) -> Result<bool> {
        Ok(self.store.read().await.contains_link(link))
    }

    async fn save_article(&self, candidate: &ArticleCandidate) -> Result<ArticleId> {
        self.store.write().await.store_article(candidate)
    }

    async fn save_disease_case(&self, record: &DiseaseCaseRecord) -> Result<()> {
        self.store.write().await.store_case(record)
    }

    async fn list_keywords(&self) -> Result<Vec<String>> {
        let store = self.store.read().await;
        Ok(store.keywords_newest_first().map(|k| k.text.clone()).collect())
    }

    async fn list_whitelist_domains(&self) -> Result<Vec<String>> {
        let store = self.store.read().await;
        Ok(store
            .whitelist
            .iter()
            .filter(|w| w.is_active)
            .map(|w| w.domain.to_lowercase())
            .collect())
    }
}

#[async_trait]
impl CatalogStorage for InMemoryStorage {
    fn as_article_storage(self: Arc<Self>) -> Arc<dyn ArticleStorage> {
        self
    }

    async fn list_articles(&self, skip: usize, limit: usize) -> Result<Vec<StoredArticle>> {
        let store = self.store.read().await;
        let mut articles = store.articles.clone();
        articles.sort_by(|a, b| b.article.published_at.cmp(&a.article.published_at));
        Ok(articles.into_iter().skip(skip).take(limit).collect())
    }

    async fn keywords(&self, skip: usize, limit: usize) -> Result<Vec<Keyword>> {
        let store = self.store.read().await;
        Ok(store.keywords_newest_first().skip(skip).take(limit).cloned().collect())
    }

    async fn create_keyword(&self, text: &str) -> Result<Keyword> {
        self.store.write().await.add_keyword(text)
    }

    async fn delete_keyword(&self, id: i64) -> Result<()> {
        self.store.write().await.remove_keyword(id)
    }

    async fn whitelist(&self, skip: usize, limit: usize) -> Result<Vec<WhitelistDomain>> {
        let store = self.store.read().await;
        Ok(store.whitelist.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn create_whitelist_domain(&self, domain: &str, is_active: bool) -> Result<WhitelistDomain> {
        self.store.write().await.add_whitelist_domain(domain, is_active)
    }

    async fn overview_stats(&self, now: DateTime<Utc>) -> Result<OverviewStats> {
        Ok(self.store.read().await.overview(now))
    }

    async fn trend_data(&self, since: DateTime<Utc>) -> Result<Vec<TrendPoint>> {
        Ok(self.store.read().await.trend(since))
    }
}
