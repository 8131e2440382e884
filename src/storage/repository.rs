//! Per-entity writes. Each takes the connection of an open transaction so the
//! caller decides where a listing's unit of work begins and ends.

use crate::error::PersistError;
use crate::models::{truncate_field, Listing, ListingImage, PublisherInfo, SourceData};
use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info};

/// Whether a property row was created or refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Create the source row if it does not exist yet
pub async fn ensure_source(
    conn: &mut SqliteConnection,
    source: &SourceData,
) -> Result<(), PersistError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM sources_data WHERE id = ?")
        .bind(source.id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_some() {
        return Ok(());
    }

    sqlx::query("INSERT INTO sources_data (id, name, portal_url) VALUES (?, ?, ?)")
        .bind(source.id)
        .bind(truncate_field(&source.name))
        .bind(truncate_field(&source.portal_url))
        .execute(&mut *conn)
        .await?;

    info!("Source created: {} (ID: {})", source.name, source.id);
    Ok(())
}

/// Create the publisher row on first sight of its id. Existing rows are left untouched.
pub async fn ensure_publisher(
    conn: &mut SqliteConnection,
    publisher_id: i64,
    publisher: &PublisherInfo,
) -> Result<(), PersistError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM publisher WHERE id = ?")
        .bind(publisher_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_some() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO publisher (id, name, url, logo_url, phone, address) VALUES (?, ?, ?, ?, ?, NULL)",
    )
    .bind(publisher_id)
    .bind(non_empty(&publisher.name))
    .bind(non_empty(&publisher.url))
    .bind(non_empty(&publisher.logo_url))
    .bind(non_empty(&publisher.phone))
    .execute(&mut *conn)
    .await?;

    info!("Publisher created: {} (ID: {})", publisher.name, publisher_id);
    Ok(())
}

/// Keys a property row is written under
#[derive(Debug, Clone, Copy)]
pub struct PropertyKeys {
    pub publication_id: i64,
    pub source_id: i64,
    pub publisher_id: i64,
    pub location_id: i64,
}

/// Insert the property, or refresh the mutable fields of the row already
/// stored under `(publication_id, source_id)`.
///
/// Location and structural fields are written on insert only.
pub async fn upsert_property(
    conn: &mut SqliteConnection,
    keys: PropertyKeys,
    listing: &Listing,
    now: NaiveDateTime,
) -> Result<(i64, UpsertOutcome), PersistError> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM properties WHERE publication_id = ? AND source_id = ?",
    )
    .bind(keys.publication_id)
    .bind(keys.source_id)
    .fetch_optional(&mut *conn)
    .await?;

    let expenses = listing.expenses.map(|amount| amount.to_string());

    if let Some(id) = existing {
        sqlx::query(
            r#"
            UPDATE properties SET
                updated_at = ?,
                sell_price = ?,
                rent_price = ?,
                sell_currency = ?,
                rent_currency = ?,
                expenses = ?,
                expenses_currency = ?,
                title = ?,
                description = ?,
                url = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(listing.sell_price)
        .bind(listing.rent_price)
        .bind(listing.sell_currency.as_deref().map(truncate_field))
        .bind(listing.rent_currency.as_deref().map(truncate_field))
        .bind(expenses)
        .bind(listing.expenses_currency.as_deref().map(truncate_field))
        .bind(truncate_field(&listing.title))
        .bind(truncate_field(&listing.description))
        .bind(truncate_field(&listing.url))
        .bind(id)
        .execute(&mut *conn)
        .await?;

        debug!("Property {} already stored as {}, updated", keys.publication_id, id);
        return Ok((id, UpsertOutcome::Updated));
    }

    // `enviroments` is the column name the deployed schema uses
    let result = sqlx::query(
        r#"
        INSERT INTO properties (
            publication_id, source_id, publisher_id, location_id,
            updated_at, created_at,
            sell_price, rent_price, sell_currency, rent_currency,
            expenses, expenses_currency,
            location_description, garage_quantity, property_type,
            url, title, enviroments, bedrooms, bathrooms,
            antiquity, address, description
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(keys.publication_id)
    .bind(keys.source_id)
    .bind(keys.publisher_id)
    .bind(keys.location_id)
    .bind(now)
    .bind(now.and_utc().to_rfc3339())
    .bind(listing.sell_price)
    .bind(listing.rent_price)
    .bind(listing.sell_currency.as_deref().map(truncate_field))
    .bind(listing.rent_currency.as_deref().map(truncate_field))
    .bind(expenses)
    .bind(listing.expenses_currency.as_deref().map(truncate_field))
    .bind(truncate_field(&listing.location))
    .bind(listing.garages)
    .bind(truncate_field(&listing.property_type))
    .bind(truncate_field(&listing.url))
    .bind(truncate_field(&listing.title))
    .bind(listing.environments)
    .bind(listing.bedrooms)
    .bind(listing.bathrooms)
    .bind(listing.antiquity.as_deref().map(truncate_field))
    .bind(truncate_field(&listing.address))
    .bind(truncate_field(&listing.description))
    .execute(&mut *conn)
    .await?;

    let id = result.last_insert_rowid();
    debug!("Property {} stored as {}", keys.publication_id, id);
    Ok((id, UpsertOutcome::Inserted))
}

/// Replace the whole image set of a property with `images`
pub async fn replace_images(
    conn: &mut SqliteConnection,
    property_id: i64,
    source_id: i64,
    images: &[ListingImage],
) -> Result<(), PersistError> {
    sqlx::query("DELETE FROM images WHERE property_id = ? AND source_id = ?")
        .bind(property_id)
        .bind(source_id)
        .execute(&mut *conn)
        .await?;

    if images.is_empty() {
        return Ok(());
    }

    let mut insert: QueryBuilder<Sqlite> =
        QueryBuilder::new(r#"INSERT INTO images (property_id, source_id, image_url, "order") "#);
    insert.push_values(images, |mut row, image| {
        row.push_bind(property_id)
            .push_bind(source_id)
            .push_bind(truncate_field(&image.url))
            .push_bind(image.order);
    });
    insert.build().execute(&mut *conn).await?;

    debug!("{} images stored for property {}", images.len(), property_id);
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    Some(truncate_field(value)).filter(|v| !v.is_empty())
}
