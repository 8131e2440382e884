use crate::error::ScrapeError;
use crate::models::SourceData;
use crate::scrapers::types::ScrapeParams;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// How listing pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetcherKind {
    /// Plain HTTP requests
    Http,
    /// Headless Chrome, for pages that need JavaScript
    Browser,
}

/// Scrape real-estate listings into a SQLite database and a CSV file
#[derive(Debug, Clone, Parser)]
#[command(name = "listing-scout", version, about)]
pub struct Cli {
    /// Listing URL to scrape (any page of the result set)
    #[arg(default_value = "https://www.zonaprop.com.ar/departamentos-alquiler.html")]
    pub url: String,

    /// Database to persist listings into
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://listings.db?mode=rwc")]
    pub database_url: String,

    /// Skip database persistence
    #[arg(long)]
    pub no_db: bool,

    /// Seconds to wait between page requests
    #[arg(long, env = "SCRAPE_DELAY_SECS", default_value_t = 3)]
    pub delay_secs: u64,

    /// Maximum number of pages to request
    #[arg(long, env = "SCRAPE_MAX_PAGES", default_value_t = 500)]
    pub max_pages: u32,

    /// Stop after this many consecutive pages without listings
    #[arg(long, env = "SCRAPE_MAX_EMPTY_PAGES", default_value_t = 2)]
    pub max_empty_pages: u32,

    /// Page fetcher to use
    #[arg(long, value_enum, env = "SCRAPE_FETCHER", default_value_t = FetcherKind::Http)]
    pub fetcher: FetcherKind,

    /// Directory for the CSV export
    #[arg(long, env = "OUTPUT_DIR", default_value = "data")]
    pub output_dir: PathBuf,

    /// Also write all listings as pretty JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Source id stored with every property
    #[arg(long, env = "SOURCE_ID", default_value_t = 1)]
    pub source_id: i64,

    /// Source display name
    #[arg(long, env = "SOURCE_NAME", default_value = "ZonaProp")]
    pub source_name: String,

    /// Portal root URL; listing URLs must belong to this host
    #[arg(long, env = "SOURCE_PORTAL_URL", default_value = "https://www.zonaprop.com.ar")]
    pub portal_url: String,
}

impl Cli {
    pub fn source(&self) -> SourceData {
        SourceData {
            id: self.source_id,
            name: self.source_name.clone(),
            portal_url: self.portal_url.clone(),
        }
    }

    pub fn scrape_params(&self) -> Result<ScrapeParams, ScrapeError> {
        let mut params = ScrapeParams::for_url(&self.url, &self.portal_url)?;
        params.delay = Duration::from_secs(self.delay_secs);
        params.max_pages = self.max_pages;
        params.max_empty_pages = self.max_empty_pages;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_rental_listings() {
        let cli = Cli::try_parse_from(["listing-scout"]).unwrap();
        let params = cli.scrape_params().unwrap();

        assert_eq!(
            params.base_url,
            "https://www.zonaprop.com.ar/departamentos-alquiler"
        );
        assert_eq!(params.delay, Duration::from_secs(3));
        assert_eq!(cli.source(), SourceData::default());
        assert_eq!(cli.fetcher, FetcherKind::Http);
    }

    #[test]
    fn flags_override_params() {
        let cli = Cli::try_parse_from([
            "listing-scout",
            "https://www.zonaprop.com.ar/casas-venta-pagina-4.html",
            "--delay-secs",
            "0",
            "--max-pages",
            "10",
            "--fetcher",
            "browser",
        ])
        .unwrap();
        let params = cli.scrape_params().unwrap();

        assert_eq!(params.base_url, "https://www.zonaprop.com.ar/casas-venta");
        assert!(params.delay.is_zero());
        assert_eq!(params.max_pages, 10);
        assert_eq!(cli.fetcher, FetcherKind::Browser);
    }
}
