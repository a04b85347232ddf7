//! Semantic response matching for conversational turns
//!
//! Features:
//! - Hash-based character/word embeddings (no model download)
//! - Flat squared-L2 nearest-neighbour index over template triggers
//! - Typed canned responses loaded from YAML or JSON, with a bundled set
//! - Core `SemanticResponseMatcher` trait implementation

pub mod embeddings;
pub mod index;
pub mod templates;

pub use embeddings::{EmbeddingConfig, HashEmbedder};
pub use index::{TemplateIndex, TemplateIndexConfig};
pub use templates::TemplateFile;

use thiserror::Error;

/// Template index errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Template load error: {0}")]
    Load(String),
}

impl From<RagError> for kiosk_agent_core::Error {
    fn from(err: RagError) -> Self {
        kiosk_agent_core::Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
