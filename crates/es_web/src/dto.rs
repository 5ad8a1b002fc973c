use chrono::{DateTime, Utc};
use es_core::{join_tags, split_tags, ArticleCandidate, Keyword, ScanResult, StoredArticle};
use es_scanner::trust::normalize_domain;
use serde::{Deserialize, Serialize};

/// Article wire shape shared by scan results, listings and manual saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleBody {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub keywords_matched: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub is_whitelisted: bool,
}

impl From<&ArticleCandidate> for ArticleBody {
    fn from(article: &ArticleCandidate) -> Self {
        Self {
            title: article.title.clone(),
            link: article.link.clone(),
            summary: Some(article.summary.clone()),
            source: Some(article.source_domain.clone()),
            published_date: Some(article.published_at),
            keywords_matched: Some(article.keywords_matched()),
            tags: join_tags(&article.tags),
            is_whitelisted: article.is_trusted,
        }
    }
}

impl ArticleBody {
    /// Converts a reviewed article into a storable candidate. Missing source
    /// is derived from the link, missing date becomes `now`.
    pub fn into_candidate(self, now: DateTime<Utc>) -> ArticleCandidate {
        let source_domain = self
            .source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| normalize_domain(&self.link));
        ArticleCandidate {
            source_domain,
            published_at: self.published_date.unwrap_or(now),
            matched_keywords: self
                .keywords_matched
                .map(|k| {
                    k.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            tags: split_tags(self.tags.as_deref()),
            summary: self.summary.unwrap_or_default(),
            is_trusted: self.is_whitelisted,
            title: self.title,
            link: self.link,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleDto {
    pub id: i64,
    #[serde(flatten)]
    pub article: ArticleBody,
}

impl From<&StoredArticle> for ArticleDto {
    fn from(stored: &StoredArticle) -> Self {
        Self {
            id: stored.id,
            article: ArticleBody::from(&stored.article),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResultDto {
    pub saved_trusted_count: usize,
    pub unknown_articles: Vec<ArticleBody>,
}

impl From<&ScanResult> for ScanResultDto {
    fn from(result: &ScanResult) -> Self {
        Self {
            saved_trusted_count: result.saved_trusted_count,
            unknown_articles: result.unknown_articles.iter().map(ArticleBody::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordDto {
    pub id: i64,
    pub text: String,
}

impl From<Keyword> for KeywordDto {
    fn from(keyword: Keyword) -> Self {
        Self {
            id: keyword.id,
            text: keyword.text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct KeywordCreate {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct WhitelistCreate {
    pub domain: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_trend_days")]
    pub days: i64,
}

fn default_trend_days() -> i64 {
    7
}
