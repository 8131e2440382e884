use crate::models::{Listing, Operation};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Flat CSV row for one listing
#[derive(Debug, Serialize)]
struct ListingRow<'a> {
    publication_id: Option<i64>,
    title: &'a str,
    generated_title: &'a str,
    url: &'a str,
    operation: Option<&'static str>,
    sell_price: Option<f64>,
    sell_currency: Option<&'a str>,
    rent_price: Option<f64>,
    rent_currency: Option<&'a str>,
    expenses: Option<f64>,
    expenses_currency: Option<&'a str>,
    total_area: Option<f64>,
    covered_area: Option<f64>,
    environments: Option<i64>,
    bedrooms: Option<i64>,
    bathrooms: Option<i64>,
    garages: Option<i64>,
    antiquity: Option<&'a str>,
    publisher_id: Option<i64>,
    publisher_name: &'a str,
    address: &'a str,
    location: &'a str,
    city: &'a str,
    location_code: &'a str,
    description: &'a str,
    property_type: &'a str,
    images: String,
    scraped_at: String,
}

impl<'a> From<&'a Listing> for ListingRow<'a> {
    fn from(listing: &'a Listing) -> Self {
        Self {
            publication_id: listing.publication_id,
            title: &listing.title,
            generated_title: &listing.generated_title,
            url: &listing.url,
            operation: listing.operation.map(|op| match op {
                Operation::Sell => "sell",
                Operation::Rent => "rent",
            }),
            sell_price: listing.sell_price,
            sell_currency: listing.sell_currency.as_deref(),
            rent_price: listing.rent_price,
            rent_currency: listing.rent_currency.as_deref(),
            expenses: listing.expenses,
            expenses_currency: listing.expenses_currency.as_deref(),
            total_area: listing.total_area,
            covered_area: listing.covered_area,
            environments: listing.environments,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            garages: listing.garages,
            antiquity: listing.antiquity.as_deref(),
            publisher_id: listing.publisher.id,
            publisher_name: &listing.publisher.name,
            address: &listing.address,
            location: &listing.location,
            city: &listing.city,
            location_code: &listing.location_code,
            description: &listing.description,
            property_type: &listing.property_type,
            images: listing
                .images
                .iter()
                .map(|image| image.url.as_str())
                .collect::<Vec<_>>()
                .join("|"),
            scraped_at: listing.scraped_at.to_rfc3339(),
        }
    }
}

/// Export file name derived from the listing URL and the run time,
/// e.g. `departamentos-alquiler_20240131_142501.csv`
pub fn export_file_name(base_url: &str, at: DateTime<Local>) -> String {
    let slug = base_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("listings");
    format!("{}_{}.csv", slug, at.format("%Y%m%d_%H%M%S"))
}

/// Write all listings as CSV into `dir`, returning the file path
pub fn write_csv(listings: &[Listing], dir: &Path, base_url: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(export_file_name(base_url, Local::now()));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for listing in listings {
        writer.serialize(ListingRow::from(listing))?;
    }
    writer.flush()?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingImage;
    use chrono::TimeZone;

    #[test]
    fn file_name_uses_last_path_segment() {
        let at = Local.with_ymd_and_hms(2024, 1, 31, 14, 25, 1).unwrap();
        assert_eq!(
            export_file_name("https://www.zonaprop.com.ar/departamentos-alquiler", at),
            "departamentos-alquiler_20240131_142501.csv"
        );
    }

    #[test]
    fn writes_one_row_per_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Listing::empty();
        first.publication_id = Some(1);
        first.title = "Loft, with comma".to_string();
        first.images = vec![
            ListingImage {
                url: "https://img.example/a.jpg".to_string(),
                order: 1,
            },
            ListingImage {
                url: "https://img.example/b.jpg".to_string(),
                order: 2,
            },
        ];
        let second = Listing::empty();

        let path = write_csv(
            &[first, second],
            dir.path(),
            "https://www.zonaprop.com.ar/casas-venta",
        )
        .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "publication_id");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "Loft, with comma");
        let images = headers.iter().position(|h| h == "images").unwrap();
        assert_eq!(
            &rows[0][images],
            "https://img.example/a.jpg|https://img.example/b.jpg"
        );
        assert_eq!(&rows[1][0], "");
    }
}
