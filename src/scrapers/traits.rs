use crate::error::ScrapeError;
use async_trait::async_trait;

/// Common trait for anything that can turn a URL into rendered page text.
/// Scraping logic only ever sees HTML, so HTTP and browser transports are interchangeable.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the full page text for `url`
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;

    /// Get the name of the fetcher
    fn name(&self) -> &'static str;
}
