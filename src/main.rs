mod config;
mod error;
mod export;
mod models;
mod pipeline;
mod scrapers;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, FetcherKind};
use scrapers::{BrowserFetcher, HttpFetcher, PageFetcher};
use storage::ListingStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let params = cli.scrape_params()?;

    info!("Listing Scout");
    info!("Running scraper for {}", params.base_url);
    info!("This may take a while...");

    let fetcher: Box<dyn PageFetcher> = match cli.fetcher {
        FetcherKind::Http => Box::new(HttpFetcher::new()?),
        FetcherKind::Browser => Box::new(BrowserFetcher::new()?),
    };

    let store = if cli.no_db {
        None
    } else {
        let store = ListingStore::connect(&cli.database_url, cli.source())
            .await
            .with_context(|| format!("Failed to open database {}", cli.database_url))?;
        store.migrate().await.context("Failed to create schema")?;
        info!("Database persistence enabled - each page is saved as it is scraped");
        Some(store)
    };

    let outcome = pipeline::run(fetcher.as_ref(), &params, store.as_ref()).await;

    // Close the session on both paths before reporting
    if let Some(store) = store {
        store.close().await;
    }
    let summary = outcome.context("Scraping failed")?;

    info!(
        "Scraped {} of {} reported listings",
        summary.listings.len(),
        summary.reported_total
    );
    if let Some(report) = &summary.persistence {
        info!("Saved {} properties to the database", report.persisted);
        for failure in &report.failures {
            warn!(
                "Not saved: {:?} ({})",
                failure.publication_id, failure.reason
            );
        }
    }

    let csv_path = export::write_csv(&summary.listings, &cli.output_dir, &params.base_url)?;
    info!("Data saved to {}", csv_path.display());

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&summary.listings)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved all listings to {}", path.display());
    }

    Ok(())
}
