use async_trait::async_trait;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::types::{
    ArticleCandidate, ArticleId, DiseaseCaseRecord, Keyword, OverviewStats, StoredArticle,
    TrendPoint, WhitelistDomain,
};
use crate::Result;

/// The persistence operations the scan pipeline depends on.
#[async_trait]
pub trait ArticleStorage: Send + Sync {
    async fn article_exists_by_link(&self, link: &str) -> Result<bool>;

    /// Store a candidate. Must be an atomic check-then-insert: a link that is
    /// already stored yields `Error::AlreadyExists`.
    async fn save_article(&self, candidate: &ArticleCandidate) -> Result<ArticleId>;

    async fn save_disease_case(&self, record: &DiseaseCaseRecord) -> Result<()>;

    /// Keyword texts, newest first.
    async fn list_keywords(&self) -> Result<Vec<String>>;

    /// Active whitelist domains, lower-cased.
    async fn list_whitelist_domains(&self) -> Result<Vec<String>>;
}

/// Administrative and reporting operations used by the API layer.
#[async_trait]
pub trait CatalogStorage: ArticleStorage {
    /// View of the same backend as the pipeline-facing trait object.
    fn as_article_storage(self: Arc<Self>) -> Arc<dyn ArticleStorage>;

    /// Stored articles ordered by publish date, newest first.
    async fn list_articles(&self, skip: usize, limit: usize) -> Result<Vec<StoredArticle>>;

    async fn keywords(&self, skip: usize, limit: usize) -> Result<Vec<Keyword>>;

    async fn create_keyword(&self, text: &str) -> Result<Keyword>;

    async fn delete_keyword(&self, id: i64) -> Result<()>;

    async fn whitelist(&self, skip: usize, limit: usize) -> Result<Vec<WhitelistDomain>>;

    async fn create_whitelist_domain(&self, domain: &str, is_active: bool) -> Result<WhitelistDomain>;

    async fn overview_stats(&self, now: DateTime<Utc>) -> Result<OverviewStats>;

    /// Case totals per report day since `since`, ascending by date.
    async fn trend_data(&self, since: DateTime<Utc>) -> Result<Vec<TrendPoint>>;
}
