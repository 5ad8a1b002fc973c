use async_trait::async_trait;
use crate::types::FeedEntry;
use crate::Result;

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Fetch and parse the feed at `url`, returning entries in delivery order.
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>>;
}
