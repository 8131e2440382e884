use crate::error::ScrapeError;
use crate::models::Listing;
use crate::scrapers::{PageFetcher, Paginator, ScrapeParams};
use crate::storage::{ListingStore, PersistReport};
use tracing::{debug, info};

/// What one scrape run produced
#[derive(Debug)]
pub struct RunSummary {
    pub listings: Vec<Listing>,
    pub reported_total: usize,
    pub pages: u32,
    pub persistence: Option<PersistReport>,
}

/// Walk every page and, when a store is given, save each page's listings as soon as it is extracted
pub async fn run(
    fetcher: &dyn PageFetcher,
    params: &ScrapeParams,
    store: Option<&ListingStore>,
) -> Result<RunSummary, ScrapeError> {
    info!("Running {} scraper for {}", fetcher.name(), params.base_url);

    let mut paginator = Paginator::new(fetcher, params);
    let mut listings = Vec::new();
    let mut persistence = store.map(|_| PersistReport::default());
    let mut pages = 0;

    while let Some(page) = paginator.next_page().await? {
        pages += 1;
        debug!("Page {} yielded {} listings", page.number, page.listings.len());
        if let (Some(store), Some(report)) = (store, persistence.as_mut()) {
            report.merge(store.save_all(&page.listings).await);
        }
        listings.extend(page.listings);
    }

    info!(
        "Scraping finished: {} listings from {} pages",
        listings.len(),
        pages
    );

    Ok(RunSummary {
        listings,
        reported_total: paginator.total().unwrap_or(0),
        pages,
        persistence,
    })
}
