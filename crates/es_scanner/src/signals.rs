use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use es_core::{Error, Result, Tag};

#[derive(Debug, Clone)]
pub struct TagDetector {
    alert_phrases: Vec<String>,
    recent_window: Duration,
}

impl TagDetector {
    pub fn new(alert_phrases: &[String], recent_window_hours: i64) -> Self {
        Self {
            alert_phrases: alert_phrases.iter().map(|p| p.to_lowercase()).collect(),
            recent_window: Duration::hours(recent_window_hours),
        }
    }

    /// Recency tag first, then the alert tag; either, both or neither.
    pub fn detect(&self, title: &str, published_at: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Tag> {
        let mut tags = Vec::with_capacity(2);
        if now - published_at < self.recent_window {
            tags.push(Tag::New);
        }
        let title = title.to_lowercase();
        if self.alert_phrases.iter().any(|p| !p.is_empty() && title.contains(p.as_str())) {
            tags.push(Tag::Alert);
        }
        tags
    }
}

/// Pattern-based case-count heuristic. Not entity extraction: it finds
/// "N ca mắc"-style phrasing and nothing more.
#[derive(Debug, Clone)]
pub struct CaseCountExtractor {
    patterns: Vec<Regex>,
}

impl CaseCountExtractor {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::Config(format!("Invalid case-count pattern {:?}: {}", p, e))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// The first pattern that matches decides the result; its first capture
    /// group that parses as an integer is the count. `0` means no signal.
    pub fn extract(&self, text: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        let lowered = text.to_lowercase();
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&lowered) {
                return caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .find_map(|group| group.as_str().parse::<u64>().ok())
                    .unwrap_or(0);
            }
        }
        0
    }

    pub fn extract_from(&self, title: &str, summary: &str) -> u64 {
        self.extract(&format!("{} {}", title, summary))
    }
}
