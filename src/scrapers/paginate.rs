use crate::error::ScrapeError;
use crate::models::Listing;
use crate::scrapers::normalize::normalize_listing;
use crate::scrapers::state::{extract_page_state, PageState};
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::ScrapeParams;
use tracing::{debug, info, warn};

/// One extracted page of listings
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub listings: Vec<Listing>,
}

/// Walks listing pages until the total reported by page 1 has been collected.
///
/// Pages are fetched strictly one after another with the politeness delay in
/// between. Besides the reported total, the walk is bounded by `max_pages`
/// and by a run of `max_empty_pages` pages that yield nothing.
pub struct Paginator<'a> {
    fetcher: &'a dyn PageFetcher,
    params: &'a ScrapeParams,
    page_number: u32,
    total: Option<usize>,
    collected: usize,
    empty_streak: u32,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, params: &'a ScrapeParams) -> Self {
        Self {
            fetcher,
            params,
            page_number: 1,
            total: None,
            collected: 0,
            empty_streak: 0,
            done: false,
        }
    }

    /// Total reported by the first page, once known
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Fetch and extract the next page, or `None` once the walk is over.
    ///
    /// A transport failure ends the walk and is returned to the caller.
    pub async fn next_page(&mut self) -> Result<Option<Page>, ScrapeError> {
        if self.done || !self.should_continue() {
            self.done = true;
            return Ok(None);
        }

        if self.page_number > 1 && !self.params.delay.is_zero() {
            tokio::time::sleep(self.params.delay).await;
        }

        let number = self.page_number;
        let url = self.params.page_url(number);
        info!("Page {}: {}", number, url);

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        let state = extract_page_state(&html);
        if let PageState::NotFound(reason) = &state {
            warn!("No listing state on page {}: {}", number, reason);
        }

        if self.total.is_none() {
            let total = state.total();
            info!("Total listings reported: {}", total);
            self.total = Some(total);
            if total == 0 {
                self.done = true;
                return Ok(None);
            }
        }

        let listings: Vec<Listing> = state
            .listings()
            .iter()
            .map(|raw| normalize_listing(raw, &self.params.portal_url))
            .collect();
        debug!("Found {} listings on page {}", listings.len(), number);

        if listings.is_empty() {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
        }
        self.collected += listings.len();
        self.page_number += 1;

        Ok(Some(Page { number, listings }))
    }

    /// Run the whole walk and return every listing in page order
    pub async fn collect_all(&mut self) -> Result<Vec<Listing>, ScrapeError> {
        let mut listings = Vec::new();
        while let Some(page) = self.next_page().await? {
            listings.extend(page.listings);
        }
        Ok(listings)
    }

    fn should_continue(&self) -> bool {
        let Some(total) = self.total else {
            return true;
        };

        if self.collected >= total {
            info!("Collected {} of {} listings", self.collected, total);
            return false;
        }
        if self.page_number > self.params.max_pages {
            warn!(
                "Stopping at page limit {} with {} of {} listings",
                self.params.max_pages, self.collected, total
            );
            return false;
        }
        if self.empty_streak >= self.params.max_empty_pages.max(1) {
            warn!(
                "Stopping after {} empty pages with {} of {} listings",
                self.empty_streak, self.collected, total
            );
            return false;
        }
        true
    }
}
