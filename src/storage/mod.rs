//! Relational persistence for scraped listings.
//!
//! A [`ListingStore`] owns the single database session of a run. Every
//! listing is written in its own transaction so one bad record never leaves
//! partial rows behind or stops the rest of the batch.

pub mod location;
pub mod repository;

use crate::error::PersistError;
use crate::models::{Listing, SourceData};
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

pub use location::location_id;
pub use repository::UpsertOutcome;
use repository::PropertyKeys;

/// Result of writing one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedListing {
    pub property_id: i64,
    pub outcome: UpsertOutcome,
}

/// A listing that could not be stored
#[derive(Debug, Clone, Serialize)]
pub struct PersistFailure {
    pub publication_id: Option<i64>,
    pub reason: String,
}

/// Outcome of a batch write
#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistReport {
    pub persisted: usize,
    pub failures: Vec<PersistFailure>,
}

impl PersistReport {
    pub fn merge(&mut self, other: PersistReport) {
        self.persisted += other.persisted;
        self.failures.extend(other.failures);
    }
}

/// SQLite-backed listing store
pub struct ListingStore {
    pool: SqlitePool,
    source: SourceData,
}

impl ListingStore {
    /// Open the database at `database_url`, e.g. `sqlite://listings.db?mode=rwc`
    pub async fn connect(database_url: &str, source: SourceData) -> Result<Self, PersistError> {
        // One connection for the whole run; this also keeps `:memory:` databases alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?;

        Ok(Self { pool, source })
    }

    /// In-memory store with the schema already created
    #[cfg(test)]
    pub async fn in_memory(source: SourceData) -> Result<Self, PersistError> {
        let store = Self::connect("sqlite::memory:", source).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Create the tables if they do not exist
    pub async fn migrate(&self) -> Result<(), PersistError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources_data (
                id INTEGER PRIMARY KEY NOT NULL,
                name VARCHAR(255),
                portal_url VARCHAR(255)
            );

            CREATE TABLE IF NOT EXISTS publisher (
                id INTEGER PRIMARY KEY NOT NULL,
                name VARCHAR(255),
                url VARCHAR(255),
                logo_url VARCHAR(255),
                phone VARCHAR(255),
                address VARCHAR(255)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS properties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                publication_id INTEGER NOT NULL,
                source_id INTEGER NOT NULL REFERENCES sources_data (id),
                updated_at DATETIME,
                created_at VARCHAR(255),
                sell_price REAL,
                rent_price REAL,
                sell_currency VARCHAR(255),
                rent_currency VARCHAR(255),
                expenses VARCHAR(255),
                expenses_currency VARCHAR(255),
                publisher_id INTEGER NOT NULL REFERENCES publisher (id),
                location_id INTEGER NOT NULL,
                location_description VARCHAR(255),
                garage_quantity INTEGER,
                property_type VARCHAR(255),
                url VARCHAR(255),
                title VARCHAR(255),
                enviroments INTEGER,
                bedrooms INTEGER,
                bathrooms INTEGER,
                antiquity VARCHAR(255),
                address VARCHAR(255),
                description VARCHAR(255),
                -- SQLite has no AUTOINCREMENT with a composite primary key, so the natural key is a unique constraint
                UNIQUE (publication_id, source_id)
            );

            CREATE INDEX IF NOT EXISTS properties_publisher_id_foreign ON properties (publisher_id);
            CREATE INDEX IF NOT EXISTS properties_source_id_foreign ON properties (source_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                property_id INTEGER NOT NULL,
                source_id INTEGER NOT NULL REFERENCES sources_data (id),
                image_url VARCHAR(255),
                "order" INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_property_source ON images (property_id, source_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write one listing with its publisher and images in a single transaction
    pub async fn save_listing(&self, listing: &Listing) -> Result<SavedListing, PersistError> {
        let publication_id = listing
            .publication_id
            .ok_or(PersistError::MissingPublicationId)?;

        // Dropping `tx` without committing rolls everything back.
        let mut tx = self.pool.begin().await?;

        repository::ensure_source(&mut *tx, &self.source).await?;

        let publisher_id = listing
            .publisher
            .id
            .filter(|id| *id != 0)
            .ok_or(PersistError::MissingPublisherId { publication_id })?;
        repository::ensure_publisher(&mut *tx, publisher_id, &listing.publisher).await?;

        let keys = PropertyKeys {
            publication_id,
            source_id: self.source.id,
            publisher_id,
            location_id: location_id(&listing.location_code),
        };
        let now = Utc::now().naive_utc();
        let (property_id, outcome) =
            repository::upsert_property(&mut *tx, keys, listing, now).await?;

        repository::replace_images(&mut *tx, property_id, self.source.id, &listing.images).await?;

        tx.commit().await?;
        Ok(SavedListing {
            property_id,
            outcome,
        })
    }

    /// Write every listing independently; failures are logged and reported, not propagated
    pub async fn save_all(&self, listings: &[Listing]) -> PersistReport {
        let mut report = PersistReport::default();

        for listing in listings {
            match self.save_listing(listing).await {
                Ok(saved) => {
                    debug!(
                        "Property {} saved as {} ({:?})",
                        listing.publication_id.unwrap_or_default(),
                        saved.property_id,
                        saved.outcome
                    );
                    report.persisted += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to save property {}: {}",
                        listing
                            .publication_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "<no id>".to_string()),
                        e
                    );
                    report.failures.push(PersistFailure {
                        publication_id: listing.publication_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Saved {} of {} properties to the database",
            report.persisted,
            listings.len()
        );
        report
    }

    /// Release the connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
