//! Generative fallback for escalated kiosk turns
//!
//! An escalated turn becomes one chat completion: the prompt carries the
//! menu with option prices, the pending questions, the current order and
//! recent history, and the reply is mined for the first JSON object.

pub mod backend;
pub mod fallback;
pub mod prompt;

pub use backend::{GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use fallback::{parse_fallback_reply, LlmFallback};
pub use prompt::{FallbackPromptBuilder, Message, Role};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    /// Server rejected the request
    #[error("completion rejected: {0}")]
    Api(String),

    /// Transport failure, rate limit or server error; retried
    #[error("transport: {0}")]
    Network(String),

    #[error("unusable completion: {0}")]
    InvalidResponse(String),

    #[error("completion timed out")]
    Timeout,

    #[error("backend misconfigured: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for kiosk_agent_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse(msg) => {
                kiosk_agent_core::Error::MalformedFallbackResponse(msg)
            },
            other => kiosk_agent_core::Error::Fallback(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
