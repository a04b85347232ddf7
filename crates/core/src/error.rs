//! Error taxonomy shared by every kiosk agent crate
//!
//! Only `SessionNotFound` is meant to reach the caller. The other variants are
//! consumed internally: extraction and catalog misses become escalations, an
//! unavailable classifier degrades to rule-only mode and a malformed fallback
//! response is replaced by a safe default.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("No structured order change could be derived: {0}")]
    ExtractionMiss(String),

    #[error("Statistical classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Menu item not found: {0}")]
    CatalogMiss(String),

    #[error("Malformed fallback response: {0}")]
    MalformedFallbackResponse(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session limit reached: {0}")]
    SessionLimit(usize),

    #[error("Fallback error: {0}")]
    Fallback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Misses that the escalation gate treats as "extraction failed"
    pub fn is_extraction_miss(&self) -> bool {
        matches!(self, Error::ExtractionMiss(_) | Error::CatalogMiss(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedFallbackResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_miss_counts_as_extraction_miss() {
        assert!(Error::CatalogMiss("라떼".into()).is_extraction_miss());
        assert!(Error::ExtractionMiss("음".into()).is_extraction_miss());
        assert!(!Error::SessionNotFound("s1".into()).is_extraction_miss());
    }
}
