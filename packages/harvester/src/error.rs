//! Error types for the harvester.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Category code outside the published range.
    #[error("Invalid category: '{0}'. Expected a number from 1 to 14 or 'all'")]
    InvalidCategory(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from a source.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The render service rejected a request.
    #[error("Render service error (status {status}): {message}")]
    Render { status: u16, message: String },

    /// URL could not be parsed or joined.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// CSS selector could not be parsed.
    #[error("Invalid CSS selector: '{0}'")]
    InvalidSelector(String),

    /// An element did not appear before its wait expired.
    #[error("Timed out waiting for '{0}'")]
    WaitTimeout(String),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
