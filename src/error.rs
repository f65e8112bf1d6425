//! Error types for the windrose resolver
//!
//! Small per-domain error enums. Transient provider failures are
//! recovered locally by the batch resolver (the provider simply has
//! no result for that record); store and source failures are fatal.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to a provider over HTTP
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),
}

/// Errors that can occur while parsing a provider response body
#[derive(Error, Debug)]
pub enum ParseError {
    /// Response body was not the JSON shape the provider documents
    #[error("Malformed provider response: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single typed failure surfaced by the provider facade
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Response-shape failure
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Errors raised by the durable result store
///
/// Load errors are fatal: a store file that does not match the
/// documented shape aborts the run before any provider call.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O failure on the store or backup file
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV-level read/write failure
    #[error("Store CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header row is not `id,address,discrepancy` followed by
    /// `<Tag>_lat,<Tag>_lon` pairs
    #[error("Malformed store header: {0}")]
    MalformedHeader(String),

    /// A data row violates the documented cell shape
    #[error("Malformed store row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Errors raised by the input record source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Input file could not be opened
    #[error("Cannot open record source {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// CSV-level read failure
    #[error("Record source CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row has no `id` field
    #[error("Record source row {row} has no '{field}' field")]
    MissingId { row: usize, field: &'static str },
}
