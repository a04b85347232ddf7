//! Text processing errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Every text processing failure surfaces as an unavailable classifier;
/// the extractor reports misses through the core error directly.
impl From<TextProcessingError> for kiosk_agent_core::Error {
    fn from(err: TextProcessingError) -> Self {
        kiosk_agent_core::Error::ClassifierUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;
