use thiserror::Error;

/// Errors that abort a scrape run
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The page could not be fetched
    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    /// Invalid listing URL or fetcher setup
    #[error("config error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn transport(url: &str, message: impl ToString) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors that fail a single listing write
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("listing has no publication id")]
    MissingPublicationId,

    #[error("listing {publication_id} has no publisher id")]
    MissingPublisherId { publication_id: i64 },
}
