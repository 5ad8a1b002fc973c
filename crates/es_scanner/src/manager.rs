use std::sync::Arc;
use chrono::{DateTime, Utc};
use es_core::{
    ArticleCandidate, ArticleStorage, DiseaseCaseRecord, Error, FeedEntry, FeedTransport, Result,
    ScanRequest, ScanResult,
};
use crate::budget::{Clock, Deadline, SystemClock};
use crate::candidate::build_candidate;
use crate::config::{Heuristics, ScannerConfig};
use crate::dedup::SeenLinks;
use crate::filters::TextFilter;
use crate::logging::Logger;
use crate::signals::{CaseCountExtractor, TagDetector};
use crate::temporal::{resolve_published_at, within_window};
use crate::trust::{normalize_domain, TrustClassifier};

/// Runs scans: polls every configured feed and routes relevant entries to
/// auto-save (trusted source) or the unknown-review list.
pub struct ScanManager {
    storage: Arc<dyn ArticleStorage>,
    transport: Arc<dyn FeedTransport>,
    feeds: Vec<String>,
    heuristics: Heuristics,
    filter: TextFilter,
    tagger: TagDetector,
    cases: CaseCountExtractor,
    clock: Arc<dyn Clock>,
}

/// Mutable state of a single scan run.
struct ScanRun<'a> {
    request: &'a ScanRequest,
    started: DateTime<Utc>,
    keywords: Vec<String>,
    trust: TrustClassifier,
    seen: SeenLinks,
    result: ScanResult,
}

#[derive(Debug, PartialEq, Eq)]
enum Routed {
    Skipped,
    Saved,
    AlreadyStored,
    Unknown,
}

impl ScanManager {
    pub fn new(
        storage: Arc<dyn ArticleStorage>,
        transport: Arc<dyn FeedTransport>,
        config: &ScannerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let heuristics = config.heuristics.clone();
        Ok(Self {
            storage,
            transport,
            feeds: config.feeds.clone(),
            filter: TextFilter::new(&heuristics.excluded_phrases),
            tagger: TagDetector::new(&heuristics.alert_phrases, heuristics.recent_window_hours),
            cases: CaseCountExtractor::new(&heuristics.case_count_patterns)?,
            heuristics,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanResult> {
        let started = self.clock.now();
        let deadline = Deadline::new(started, request.max_execution_time);
        let log = Logger::new().with_prefix("scan".to_string());

        let keywords = self.storage.list_keywords().await?;
        if keywords.is_empty() {
            log.warn("No keywords found to scan");
            return Ok(ScanResult::default());
        }

        let configured = self.storage.list_whitelist_domains().await?;
        let trust = TrustClassifier::effective(&configured, &self.heuristics.default_whitelist);
        log.debug(&format!(
            "Trusting {} domains{}",
            trust.domains().len(),
            if configured.is_empty() { " (defaults)" } else { "" }
        ));

        let mut run = ScanRun {
            request,
            started,
            keywords,
            trust,
            seen: SeenLinks::new(),
            result: ScanResult::default(),
        };

        let mut attempted = 0usize;
        let mut failed = 0usize;

        'feeds: for feed_url in &self.feeds {
            if deadline.is_exceeded(self.clock.now()) {
                log.info(&format!(
                    "Max execution time ({}m) reached. Stopping scan.",
                    deadline.budget_minutes()
                ));
                break;
            }

            let feed_log = log.clone().with_prefix(feed_label(feed_url));
            attempted += 1;
            let entries = match self.transport.fetch(feed_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    failed += 1;
                    feed_log.error(&format!("Error fetching feed {}: {}", feed_url, e));
                    continue;
                }
            };
            feed_log.debug(&format!("{} entries", entries.len()));

            for entry in entries {
                if deadline.is_exceeded(self.clock.now()) {
                    feed_log.info(&format!(
                        "Max execution time ({}m) reached mid-feed. Stopping scan.",
                        deadline.budget_minutes()
                    ));
                    break 'feeds;
                }
                let routed = self.process_entry(entry, &mut run).await?;
                if routed != Routed::Skipped {
                    feed_log.debug(&format!("entry routed: {:?}", routed));
                }
            }
        }

        if attempted > 0 && failed == attempted {
            return Err(Error::Feed(format!(
                "None of the {} attempted feeds could be fetched",
                attempted
            )));
        }

        if run.seen.is_empty() {
            log.warn("Feeds delivered no entries");
        }
        log.info(&format!(
            "Scan finished: {} trusted articles saved, {} unknown articles, {} links seen, {}/{} feeds failed",
            run.result.saved_trusted_count,
            run.result.unknown_articles.len(),
            run.seen.len(),
            failed,
            attempted
        ));
        Ok(run.result)
    }

    async fn process_entry(&self, entry: FeedEntry, run: &mut ScanRun<'_>) -> Result<Routed> {
        if entry.link.is_empty() || !run.seen.first_sighting(&entry.link) {
            return Ok(Routed::Skipped);
        }

        let Some(matched) = self.filter.match_relevant(&entry.title, &run.keywords) else {
            return Ok(Routed::Skipped);
        };

        let published_at = resolve_published_at(&entry, run.started);
        if !within_window(published_at, run.request.days_limit, run.started) {
            return Ok(Routed::Skipped);
        }

        let mut candidate = build_candidate(&entry, matched, published_at, &self.heuristics);
        candidate.tags = self.tagger.detect(&candidate.title, published_at, run.started);
        let case_count = self.cases.extract_from(&entry.title, &entry.summary);
        candidate.is_trusted = run.trust.is_trusted(&candidate.source_domain);

        if candidate.is_trusted {
            let routed = self.save_trusted(&candidate, case_count).await?;
            if routed == Routed::Saved {
                run.result.saved_trusted_count += 1;
            }
            Ok(routed)
        } else if run.request.fetch_unknown {
            run.result.unknown_articles.push(candidate);
            Ok(Routed::Unknown)
        } else {
            Ok(Routed::Skipped)
        }
    }

    async fn save_trusted(&self, candidate: &ArticleCandidate, case_count: u64) -> Result<Routed> {
        if self.storage.article_exists_by_link(&candidate.link).await? {
            return Ok(Routed::AlreadyStored);
        }

        let article_id = match self.storage.save_article(candidate).await {
            Ok(id) => id,
            // Another scan stored the same link between the check and the insert.
            Err(Error::AlreadyExists(_)) => return Ok(Routed::AlreadyStored),
            Err(e) => return Err(e),
        };

        if case_count > 0 {
            if let Some(disease) = candidate.primary_keyword() {
                self.storage
                    .save_disease_case(&DiseaseCaseRecord {
                        article_id,
                        disease_name: disease.to_string(),
                        case_count,
                        location: self.heuristics.default_location.clone(),
                        report_date: candidate.published_at,
                    })
                    .await?;
            }
        }

        Ok(Routed::Saved)
    }
}

fn feed_label(feed_url: &str) -> String {
    let domain = normalize_domain(feed_url);
    if domain.is_empty() {
        feed_url.to_string()
    } else {
        domain
    }
}
