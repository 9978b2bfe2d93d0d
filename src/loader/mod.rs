//! Data loaders: the collaborators that fetch the full homeowners table.
//!
//! A [`DataLoader`] returns flat, string-keyed rows. Column-name and date
//! normalization are not its job; the dataset cache does that after a
//! successful fetch.

pub mod bigquery;
pub mod file;

use async_trait::async_trait;

pub use bigquery::BigQueryLoader;
pub use file::JsonFileLoader;

use crate::domain::RawRecord;

/// Failure to fetch the source table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Transport-level HTTP failure (connect, timeout, TLS, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Local I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload was not the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The warehouse accepted the request but the query failed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Fetches every row of the source table.
#[async_trait]
pub trait DataLoader: std::fmt::Debug + Send + Sync {
    /// Returns all rows of the table.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] on connectivity, authentication, query or
    /// decoding failure.
    async fn fetch_all(&self) -> Result<Vec<RawRecord>, LoadError>;

    /// Short label used in log lines.
    fn describe(&self) -> String;
}
