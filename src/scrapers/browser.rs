use crate::error::ScrapeError;
use crate::scrapers::traits::PageFetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Page fetcher driving headless Chrome, for pages that only render their state client side
pub struct BrowserFetcher {
    browser: Browser,
    settle: Duration,
}

impl BrowserFetcher {
    /// Launch a headless browser
    pub fn new() -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            settle: Duration::from_secs(2),
        })
    }

    fn render(browser: &Browser, url: &str, settle: Duration) -> Result<String> {
        let tab = browser.new_tab()?;
        let html = Self::read_page(&tab, url, settle);
        close_tab(&tab, url);
        html
    }

    fn read_page(tab: &Tab, url: &str, settle: Duration) -> Result<String> {
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        // Give late scripts a moment to fill the state blob
        thread::sleep(settle);

        let html_result = tab.evaluate("document.documentElement.outerHTML", false)?;
        html_result
            .value
            .and_then(|value| value.as_str().map(str::to_string))
            .context("Page returned no HTML")
    }
}

/// Close a tab whatever the render outcome; failures are only worth a debug line
fn close_tab(tab: &Tab, url: &str) {
    if let Err(e) = tab.close(true) {
        debug!("Failed to close tab for {}: {:#}", url, e);
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("Rendering URL: {}", url);

        let browser = self.browser.clone();
        let settle = self.settle;
        let target = url.to_string();
        let html = tokio::task::spawn_blocking(move || Self::render(&browser, &target, settle))
            .await
            .map_err(|e| ScrapeError::transport(url, e))?
            .map_err(|e| ScrapeError::transport(url, format!("{:#}", e)))?;

        debug!("Rendered {} bytes of HTML", html.len());
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
