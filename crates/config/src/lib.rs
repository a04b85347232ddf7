//! Settings, menu and dialogue strings for the kiosk agent
//!
//! `load_settings` layers `config/default`, then `config/{env}`, then
//! `KIOSK_AGENT__*` environment variables over the built-in defaults. The
//! menu and the response templates live in their own YAML files and fall
//! back to bundled sets when no path is configured.

pub mod constants;
pub mod menu;
pub mod messages;
pub mod settings;

pub use menu::{MenuConfig, StaticMenuCatalog};
pub use messages::{ClarificationTemplates, DialogueMessages};
pub use settings::{
    load_settings, ClassifierConfig, EngineConfig, FallbackConfig, ObservabilityConfig,
    RuntimeEnvironment, SemanticConfig, SessionConfig, Settings,
};

use thiserror::Error;

/// Failures while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} does not exist")]
    FileNotFound(String),

    #[error("cannot parse configuration: {0}")]
    ParseError(String),

    #[error("{0} is required")]
    MissingField(String),

    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<ConfigError> for kiosk_agent_core::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
