use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const HTML_EXTENSION: &str = ".html";
const PAGE_URL_SUFFIX: &str = "-pagina-";

/// Parameters for one paginated listing scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeParams {
    /// Listing URL without extension or page suffix
    pub base_url: String,
    /// Portal root used to absolutize listing links
    pub portal_url: String,
    /// Pause before every fetch after the first
    pub delay: Duration,
    /// Hard ceiling on pages requested in one run
    pub max_pages: u32,
    /// Consecutive pages without listings tolerated before giving up
    pub max_empty_pages: u32,
}

impl ScrapeParams {
    /// Build parameters from any listing URL of the portal
    pub fn for_url(url: &str, portal_url: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            base_url: listing_base_url(url, portal_url)?,
            portal_url: portal_url.trim_end_matches('/').to_string(),
            ..Self::default()
        })
    }

    /// URL of page `page_number` (1-based)
    pub fn page_url(&self, page_number: u32) -> String {
        if page_number <= 1 {
            format!("{}{}", self.base_url, HTML_EXTENSION)
        } else {
            format!(
                "{}{}{}{}",
                self.base_url, PAGE_URL_SUFFIX, page_number, HTML_EXTENSION
            )
        }
    }
}

impl Default for ScrapeParams {
    fn default() -> Self {
        Self {
            base_url: "https://www.zonaprop.com.ar/departamentos-alquiler".to_string(),
            portal_url: "https://www.zonaprop.com.ar".to_string(),
            delay: Duration::from_secs(3),
            max_pages: 500,
            max_empty_pages: 2,
        }
    }
}

/// Strip the extension and any page suffix, refusing URLs outside the portal
pub fn listing_base_url(url: &str, portal_url: &str) -> Result<String, ScrapeError> {
    let invalid = |what: &str, value: &str, e: url::ParseError| {
        ScrapeError::Config(format!("invalid {} {}: {}", what, value, e))
    };
    let portal = Url::parse(portal_url.trim()).map_err(|e| invalid("portal URL", portal_url, e))?;
    let mut listing = Url::parse(url.trim()).map_err(|e| invalid("listing URL", url, e))?;

    let portal_host = portal
        .host_str()
        .map(bare_host)
        .ok_or_else(|| ScrapeError::Config(format!("portal URL has no host: {}", portal_url)))?;
    if listing.host_str().map(bare_host) != Some(portal_host) {
        return Err(ScrapeError::Config(format!(
            "URL must be from {}: {}",
            portal_host, url
        )));
    }

    listing.set_query(None);
    listing.set_fragment(None);

    let mut path = listing.path().to_string();
    if let Some(stripped) = path.strip_suffix(HTML_EXTENSION) {
        path.truncate(stripped.len());
    }
    if let Some(pos) = path.rfind(PAGE_URL_SUFFIX) {
        let digits = &path[pos + PAGE_URL_SUFFIX.len()..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            path.truncate(pos);
        }
    }
    listing.set_path(&path);

    Ok(listing.as_str().to_string())
}

/// Host without a leading `www.`; `host_str` is already lowercase
fn bare_host(host: &str) -> &str {
    host.trim_start_matches("www.")
}
