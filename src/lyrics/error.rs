use thiserror::Error;

/// Errors that can occur while acquiring lyrics.
///
/// Provider failures are swallowed by [`crate::lyrics::LyricsManager`]; these only
/// reach a caller through the single-result helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LyricsError {
    #[error("lyrics not found")]
    NotFound,
    #[error("network error: {0}")]
    Network(String),
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("invalid response from server (status {0})")]
    InvalidResponse(u16),
    #[error("no lyrics provider available")]
    NoProviderAvailable,
}

impl From<reqwest::Error> for LyricsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parsing(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LyricsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parsing(err.to_string())
    }
}
