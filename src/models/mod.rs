use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of any text column in the listing store
pub const MAX_FIELD_LEN: usize = 255;

/// Truncate to at most `MAX_FIELD_LEN` characters, never splitting a code point
pub fn truncate_field(value: &str) -> String {
    match value.char_indices().nth(MAX_FIELD_LEN) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}

/// Data origin a listing was scraped from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceData {
    pub id: i64,
    pub name: String,
    pub portal_url: String,
}

impl Default for SourceData {
    fn default() -> Self {
        Self {
            id: 1,
            name: "ZonaProp".to_string(),
            portal_url: "https://www.zonaprop.com.ar".to_string(),
        }
    }
}

/// Operation a listing price refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Sell,
    Rent,
}

/// Advertiser attached to a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublisherInfo {
    pub id: Option<i64>,
    pub name: String,
    pub url: String,
    pub logo_url: String,
    pub phone: String,
}

/// One photo of a listing, in display order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingImage {
    pub url: String,
    pub order: i64,
}

/// Canonical listing record produced by the normalizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub publication_id: Option<i64>,
    pub title: String,
    pub generated_title: String,
    pub url: String,
    pub operation: Option<Operation>,
    pub sell_price: Option<f64>,
    pub sell_currency: Option<String>,
    pub rent_price: Option<f64>,
    pub rent_currency: Option<String>,
    pub expenses: Option<f64>,
    pub expenses_currency: Option<String>,
    pub total_area: Option<f64>,
    pub covered_area: Option<f64>,
    pub environments: Option<i64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub garages: Option<i64>,
    pub antiquity: Option<String>,
    pub publisher: PublisherInfo,
    pub address: String,
    pub location: String,
    pub city: String,
    /// Raw portal location code, e.g. `V1-D-1003990`
    pub location_code: String,
    pub description: String,
    pub property_type: String,
    pub images: Vec<ListingImage>,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    /// An empty record stamped with the current time
    pub fn empty() -> Self {
        Self {
            publication_id: None,
            title: String::new(),
            generated_title: String::new(),
            url: String::new(),
            operation: None,
            sell_price: None,
            sell_currency: None,
            rent_price: None,
            rent_currency: None,
            expenses: None,
            expenses_currency: None,
            total_area: None,
            covered_area: None,
            environments: None,
            bedrooms: None,
            bathrooms: None,
            garages: None,
            antiquity: None,
            publisher: PublisherInfo::default(),
            address: String::new(),
            location: String::new(),
            city: String::new(),
            location_code: String::new(),
            description: String::new(),
            property_type: String::new(),
            images: Vec::new(),
            scraped_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_values_to_limit() {
        let long = "x".repeat(300);
        assert_eq!(truncate_field(&long).chars().count(), MAX_FIELD_LEN);
        assert_eq!(truncate_field("short"), "short");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "ñ".repeat(256);
        let cut = truncate_field(&long);
        assert_eq!(cut.chars().count(), 255);
        assert_eq!(cut.len(), 510);
    }
}
