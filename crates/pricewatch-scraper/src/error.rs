use thiserror::Error;

/// Maximum length of a user-facing error message. Anything longer is
/// truncated so internal diagnostics never leak wholesale into results.
pub(crate) const MAX_ERROR_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("URL not allowed: {reason}")]
    DisallowedUrl { reason: String },

    #[error("response body exceeds {limit_bytes} bytes")]
    BodyTooLarge { limit_bytes: usize },

    #[error("headless render failed: {reason}")]
    Render { reason: String },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },
}

/// Truncates an error message to [`MAX_ERROR_LEN`] characters, respecting
/// char boundaries so multi-byte input cannot panic the slice.
pub(crate) fn truncate_error(message: &str) -> String {
    message.chars().take(MAX_ERROR_LEN).collect()
}
