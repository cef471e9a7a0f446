//! Error types for the harvester library.
//!
//! Only [`HarvestError`] and [`TokenError`] are fatal to a run. Fetch and
//! export errors are absorbed by their callers and logged.

use chrono::{DateTime, NaiveDate, Utc};

/// Fatal setup errors. Any of these aborts the run before the first request.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown {table} label: {label:?}")]
    UnknownCode { table: &'static str, label: String },

    #[error("invalid cookie {0:?}, expected name=value")]
    InvalidCookie(String),

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Credential acquisition and validation failures.
#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("no authorization token found in browser local storage")]
    Missing,

    #[error("browser token extraction failed: {0}")]
    Browser(String),

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
}

/// A failed page request against the search API.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Connection, timeout or body-read failure. The only retryable kind.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Failures while writing output files.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
