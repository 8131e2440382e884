use crate::models::{truncate_field, Listing, ListingImage, Operation, PublisherInfo};
use serde_json::Value;
use tracing::warn;

// Feature codes used by the portal's `mainFeatures` map
const FEATURE_TOTAL_AREA: &str = "CFT100";
const FEATURE_COVERED_AREA: &str = "CFT101";
const FEATURE_ENVIRONMENTS: &str = "CFT1";
const FEATURE_BEDROOMS: &str = "CFT2";
const FEATURE_BATHROOMS: &str = "CFT3";
const FEATURE_ANTIQUITY: &str = "CFT5";
const FEATURE_GARAGES: &str = "CFT7";

const PICTURE_URL_KEYS: [&str; 4] = ["url730x532", "url360x266", "resizeUrl1200x1200", "url"];

/// Map one raw posting from the preloaded state into a canonical listing.
///
/// Missing or oddly typed paths degrade to empty strings / `None`.
pub fn normalize_listing(raw: &Value, portal_url: &str) -> Listing {
    let mut listing = Listing::empty();

    listing.publication_id = int_value(&raw["postingId"]);
    if listing.publication_id.is_none() {
        warn!("Posting without a usable postingId: {}", raw["postingId"]);
    }

    listing.title = text(&raw["title"]);
    listing.generated_title = text(&raw["generatedTitle"]);
    let path = str_value(&raw["url"]);
    listing.url = if path.is_empty() {
        String::new()
    } else {
        truncate_field(&format!("{}{}", portal_url.trim_end_matches('/'), path))
    };

    apply_price(&mut listing, &raw["priceOperationTypes"]);

    let expenses = &raw["expenses"];
    listing.expenses = number(&expenses["amount"]);
    listing.expenses_currency = opt_text(&expenses["currency"]);

    let features = &raw["mainFeatures"];
    listing.total_area = number(feature(features, FEATURE_TOTAL_AREA));
    listing.covered_area = number(feature(features, FEATURE_COVERED_AREA));
    listing.environments = int_value(feature(features, FEATURE_ENVIRONMENTS));
    listing.bedrooms = int_value(feature(features, FEATURE_BEDROOMS));
    listing.bathrooms = int_value(feature(features, FEATURE_BATHROOMS));
    listing.garages = int_value(feature(features, FEATURE_GARAGES));
    listing.antiquity = opt_text(feature(features, FEATURE_ANTIQUITY));

    listing.publisher = publisher(&raw["publisher"]);

    let posting_location = &raw["postingLocation"];
    let location = &posting_location["location"];
    listing.address = text(&posting_location["address"]["name"]);
    listing.location = text(&location["name"]);
    listing.city = text(&location["parent"]["name"]);
    listing.location_code = text(&location["locationId"]);

    listing.description = text(&raw["descriptionNormalized"]);
    listing.property_type = text(&raw["realEstateType"]["name"]);
    listing.images = images(&raw["visiblePictures"]["pictures"]);

    listing
}

/// Only the first operation and its first price are considered
fn apply_price(listing: &mut Listing, operations: &Value) {
    let first = &operations[0];
    let price = &first["prices"][0];
    let amount = number(&price["amount"]);
    let currency = opt_text(&price["currency"]);
    if amount.is_none() && currency.is_none() {
        return;
    }

    let operation = operation_kind(&first["operationType"]);
    listing.operation = Some(operation);
    match operation {
        Operation::Sell => {
            listing.sell_price = amount;
            listing.sell_currency = currency;
        }
        Operation::Rent => {
            listing.rent_price = amount;
            listing.rent_currency = currency;
        }
    }
}

fn operation_kind(operation_type: &Value) -> Operation {
    let name = str_value(&operation_type["name"]).to_lowercase();
    let id = str_value(&operation_type["operationTypeId"]);
    if name.contains("venta") || name.contains("sale") || name.contains("sell") || id == "1" {
        Operation::Sell
    } else {
        Operation::Rent
    }
}

fn feature<'a>(features: &'a Value, code: &str) -> &'a Value {
    &features[code]["value"]
}

fn publisher(raw: &Value) -> PublisherInfo {
    PublisherInfo {
        id: int_value(&raw["publisherId"]),
        name: text(&raw["name"]),
        url: text(&raw["url"]),
        logo_url: text(&raw["urlLogo"]),
        phone: text(&raw["phone"]),
    }
}

fn images(pictures: &Value) -> Vec<ListingImage> {
    let Some(pictures) = pictures.as_array() else {
        return Vec::new();
    };

    pictures
        .iter()
        .filter_map(|picture| {
            PICTURE_URL_KEYS
                .iter()
                .map(|key| str_value(&picture[*key]))
                .find(|url| !url.is_empty())
        })
        .enumerate()
        .map(|(order, url)| ListingImage {
            url: truncate_field(&url),
            order: order as i64 + 1,
        })
        .collect()
}

/// String content of a JSON scalar, empty for anything else
fn str_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn text(value: &Value) -> String {
    truncate_field(str_value(value).trim())
}

fn opt_text(value: &Value) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// Finite numeric value; `NaN` and infinities count as missing
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| number(value).map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| number(value).map(|f| f as i64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PORTAL: &str = "https://www.zonaprop.com.ar";

    fn sample_posting() -> Value {
        json!({
            "postingId": "49372812",
            "title": "Departamento luminoso",
            "generatedTitle": "Depto 3 amb en Palermo",
            "url": "/propiedades/depto-palermo-49372812.html",
            "priceOperationTypes": [{
                "operationType": {"name": "Alquiler", "operationTypeId": "2"},
                "prices": [{"amount": 450000, "currency": "$"}]
            }],
            "expenses": {"amount": 85000, "currency": "$"},
            "mainFeatures": {
                "CFT100": {"label": "Superficie total", "value": "75"},
                "CFT101": {"value": "68.5"},
                "CFT1": {"value": "3"},
                "CFT2": {"value": "2"},
                "CFT3": {"value": 1},
                "CFT5": {"value": "15"}
            },
            "publisher": {
                "publisherId": "1234",
                "name": "Inmobiliaria Sur",
                "url": "/inmobiliarias/sur.html",
                "urlLogo": "https://img.example/logo.png"
            },
            "postingLocation": {
                "address": {"name": "Av. Santa Fe 3200"},
                "location": {
                    "locationId": "V1-D-1003990",
                    "name": "Palermo",
                    "parent": {"name": "Capital Federal"}
                }
            },
            "descriptionNormalized": "Hermoso departamento",
            "realEstateType": {"name": "Departamento"},
            "visiblePictures": {"pictures": [
                {"url730x532": "https://img.example/1.jpg"},
                {"url360x266": "https://img.example/2.jpg"},
                {"other": "no url"}
            ]}
        })
    }

    #[test]
    fn maps_full_posting() {
        let listing = normalize_listing(&sample_posting(), PORTAL);

        assert_eq!(listing.publication_id, Some(49372812));
        assert_eq!(
            listing.url,
            "https://www.zonaprop.com.ar/propiedades/depto-palermo-49372812.html"
        );
        assert_eq!(listing.operation, Some(Operation::Rent));
        assert_eq!(listing.rent_price, Some(450000.0));
        assert_eq!(listing.rent_currency.as_deref(), Some("$"));
        assert_eq!(listing.sell_price, None);
        assert_eq!(listing.expenses, Some(85000.0));
        assert_eq!(listing.total_area, Some(75.0));
        assert_eq!(listing.covered_area, Some(68.5));
        assert_eq!(listing.environments, Some(3));
        assert_eq!(listing.bedrooms, Some(2));
        assert_eq!(listing.bathrooms, Some(1));
        assert_eq!(listing.garages, None);
        assert_eq!(listing.antiquity.as_deref(), Some("15"));
        assert_eq!(listing.publisher.id, Some(1234));
        assert_eq!(listing.publisher.name, "Inmobiliaria Sur");
        assert_eq!(listing.publisher.logo_url, "https://img.example/logo.png");
        assert_eq!(listing.address, "Av. Santa Fe 3200");
        assert_eq!(listing.location, "Palermo");
        assert_eq!(listing.city, "Capital Federal");
        assert_eq!(listing.location_code, "V1-D-1003990");
        assert_eq!(listing.property_type, "Departamento");
        assert_eq!(listing.images.len(), 2);
        assert_eq!(listing.images[1].url, "https://img.example/2.jpg");
        assert_eq!(listing.images[1].order, 2);
    }

    #[test]
    fn sale_operation_fills_sell_price() {
        let raw = json!({
            "postingId": 7,
            "priceOperationTypes": [{
                "operationType": {"name": "Venta"},
                "prices": [{"amount": 120000, "currency": "USD"}, {"amount": 1, "currency": "$"}]
            }]
        });
        let listing = normalize_listing(&raw, PORTAL);
        assert_eq!(listing.operation, Some(Operation::Sell));
        assert_eq!(listing.sell_price, Some(120000.0));
        assert_eq!(listing.sell_currency.as_deref(), Some("USD"));
        assert_eq!(listing.rent_price, None);
    }

    #[test]
    fn empty_posting_degrades_gracefully() {
        let listing = normalize_listing(&json!({}), PORTAL);
        assert_eq!(listing.publication_id, None);
        assert_eq!(listing.url, "");
        assert_eq!(listing.operation, None);
        assert_eq!(listing.expenses, None);
        assert_eq!(listing.publisher, PublisherInfo::default());
        assert!(listing.images.is_empty());
    }

    #[test]
    fn wrong_shapes_do_not_panic() {
        let raw = json!({
            "postingId": "abc",
            "priceOperationTypes": "none",
            "mainFeatures": [1, 2],
            "publisher": null,
            "postingLocation": {"location": "Palermo"},
            "visiblePictures": {"pictures": {"url": "x"}}
        });
        let listing = normalize_listing(&raw, PORTAL);
        assert_eq!(listing.publication_id, None);
        assert_eq!(listing.location, "");
        assert!(listing.images.is_empty());
    }

    #[test]
    fn non_finite_numbers_are_missing() {
        let raw = json!({
            "postingId": "NaN",
            "priceOperationTypes": [{
                "operationType": {"name": "Alquiler"},
                "prices": [{"amount": "inf", "currency": "$"}]
            }],
            "expenses": {"amount": "-Infinity"},
            "mainFeatures": {
                "CFT100": {"value": "infinity"},
                "CFT101": {"value": " NaN "},
                "CFT1": {"value": "inf"}
            }
        });
        let listing = normalize_listing(&raw, PORTAL);
        assert_eq!(listing.publication_id, None);
        assert_eq!(listing.rent_price, None);
        assert_eq!(listing.rent_currency.as_deref(), Some("$"));
        assert_eq!(listing.expenses, None);
        assert_eq!(listing.total_area, None);
        assert_eq!(listing.covered_area, None);
        assert_eq!(listing.environments, None);
    }

    #[test]
    fn long_title_is_truncated() {
        let raw = json!({"postingId": "1", "title": "a".repeat(400)});
        let listing = normalize_listing(&raw, PORTAL);
        assert_eq!(listing.title.chars().count(), 255);
    }
}
