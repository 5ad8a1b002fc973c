use chrono::{DateTime, Utc};
use es_core::{ArticleCandidate, FeedEntry};
use crate::config::Heuristics;
use crate::trust::normalize_domain;

/// Cut `summary` to `max_chars` characters and append `marker`. Applying it
/// to its own output gives the same string back.
pub fn truncate_summary(summary: &str, max_chars: usize, marker: &str) -> String {
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    let mut truncated: String = summary.chars().take(max_chars).collect();
    truncated.push_str(marker);
    truncated
}

/// Candidate for a relevant entry. Tags and trust are filled in by the caller.
pub fn build_candidate(
    entry: &FeedEntry,
    matched_keywords: Vec<String>,
    published_at: DateTime<Utc>,
    heuristics: &Heuristics,
) -> ArticleCandidate {
    ArticleCandidate {
        title: entry.title.clone(),
        link: entry.link.clone(),
        summary: truncate_summary(&entry.summary, heuristics.summary_max_chars, &heuristics.truncation_marker),
        source_domain: normalize_domain(&entry.link),
        published_at,
        matched_keywords,
        tags: Vec::new(),
        is_trusted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_summary() {
        let summary = "á".repeat(600);
        let truncated = truncate_summary(&summary, 500, "...");
        assert_eq!(truncated.chars().count(), 503);
        assert!(truncated.ends_with("..."));
        assert!(truncated.starts_with(&"á".repeat(500)));
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let once = truncate_summary(&"x".repeat(600), 500, "...");
        let twice = truncate_summary(&once, 500, "...");
        assert_eq!(once, twice);
        assert!(!twice.ends_with("......"));
    }

    #[test]
    fn test_short_summary_untouched() {
        let summary = "y".repeat(500);
        assert_eq!(truncate_summary(&summary, 500, "..."), summary);
    }

    #[test]
    fn test_build_candidate() {
        let entry = FeedEntry {
            link: "https://www.dantri.com.vn/suc-khoe/soi.htm".to_string(),
            title: "Dịch sởi".to_string(),
            summary: "Tóm tắt".to_string(),
            published_at: None,
        };
        let now = Utc::now();
        let candidate = build_candidate(&entry, vec!["sởi".to_string()], now, &Heuristics::default());
        assert_eq!(candidate.source_domain, "dantri.com.vn");
        assert_eq!(candidate.published_at, now);
        assert_eq!(candidate.keywords_matched(), "sởi");
        assert!(!candidate.is_trusted);
    }
}
