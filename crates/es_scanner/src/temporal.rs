use chrono::{DateTime, Duration, Utc};
use es_core::FeedEntry;

/// The entry's structured publish time, or `now` when the feed gave none.
/// Undated entries therefore always fall inside any day window.
pub fn resolve_published_at(entry: &FeedEntry, now: DateTime<Utc>) -> DateTime<Utc> {
    entry.published_at.unwrap_or(now)
}

/// True iff `published_at >= now - days_limit days`. Negative limits count as
/// zero so `now` always passes; a cutoff before the representable range
/// means no cutoff at all.
pub fn within_window(published_at: DateTime<Utc>, days_limit: i64, now: DateTime<Utc>) -> bool {
    match window_start(days_limit, now) {
        Some(cutoff) => published_at >= cutoff,
        None => true,
    }
}

/// `now - days` with overflow reported as `None`.
pub fn window_start(days: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Duration::try_days(days.max(0)).and_then(|span| now.checked_sub_signed(span))
}
