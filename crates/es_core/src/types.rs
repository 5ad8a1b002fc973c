use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ArticleId = i64;

/// Derived marker attached to a candidate by the tag detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "Mới")]
    New,
    #[serde(rename = "Cảnh báo")]
    Alert,
}

impl Tag {
    pub fn label(&self) -> &'static str {
        match self {
            Tag::New => "Mới",
            Tag::Alert => "Cảnh báo",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Mới" => Some(Tag::New),
            "Cảnh báo" => Some(Tag::Alert),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Joins tags the way they are displayed and stored: `"Mới, Cảnh báo"`.
pub fn join_tags(tags: &[Tag]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    Some(tags.iter().map(Tag::label).collect::<Vec<_>>().join(", "))
}

/// Inverse of [`join_tags`]; unknown labels are dropped.
pub fn split_tags(joined: Option<&str>) -> Vec<Tag> {
    joined
        .map(|s| s.split(',').filter_map(Tag::from_label).collect())
        .unwrap_or_default()
}

/// One entry as delivered by a feed transport, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub link: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// An article that passed filtering and has been routed to trusted or unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source_domain: String,
    pub published_at: DateTime<Utc>,
    pub matched_keywords: Vec<String>,
    pub tags: Vec<Tag>,
    pub is_trusted: bool,
}

impl ArticleCandidate {
    /// Matched keywords in configuration order, joined for display.
    pub fn keywords_matched(&self) -> String {
        self.matched_keywords.join(", ")
    }

    pub fn tags_label(&self) -> Option<String> {
        join_tags(&self.tags)
    }

    /// The keyword used as the disease name of an extracted case record.
    pub fn primary_keyword(&self) -> Option<&str> {
        self.matched_keywords.first().map(String::as_str)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseCaseRecord {
    pub article_id: ArticleId,
    pub disease_name: String,
    pub case_count: u64,
    pub location: String,
    pub report_date: DateTime<Utc>,
}

/// A persisted article together with its storage identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: ArticleId,
    pub article: ArticleCandidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub fetch_unknown: bool,
    #[serde(default = "default_days_limit")]
    pub days_limit: i64,
    /// Minutes; zero or negative means unbounded.
    #[serde(default)]
    pub max_execution_time: i64,
}

fn default_days_limit() -> i64 {
    7
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            fetch_unknown: false,
            days_limit: default_days_limit(),
            max_execution_time: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub saved_trusted_count: usize,
    pub unknown_articles: Vec<ArticleCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistDomain {
    pub id: i64,
    pub domain: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub total_articles: u64,
    pub total_cases: u64,
    pub alert_count: u64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM-DD` of the report date.
    pub date: String,
    pub cases: u64,
}
