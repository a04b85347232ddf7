//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{classification, endpoints, escalation, extraction, semantic, session};
use crate::messages::DialogueMessages;
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Thresholds for the local dialogue engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Statistical intent model
    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub session: SessionConfig,

    /// Canned-response template matching
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Generative fallback
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Menu file (YAML or JSON). The bundled café menu is used when unset.
    #[serde(default)]
    pub menu_path: Option<String>,

    /// Locally produced kiosk utterances
    #[serde(default)]
    pub messages: DialogueMessages,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_engine()?;
        self.validate_session()?;
        self.validate_semantic()?;
        self.validate_fallback()?;
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        let unit_fields = [
            ("engine.rule_override_confidence", engine.rule_override_confidence),
            ("engine.menu_token_confidence", engine.menu_token_confidence),
            ("engine.escalation_confidence", engine.escalation_confidence),
            ("engine.token_match_threshold", engine.token_match_threshold),
            ("engine.verify_match_threshold", engine.verify_match_threshold),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        if engine.min_token_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.min_token_chars".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.classifier.softmax_temperature <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "classifier.softmax_temperature".to_string(),
                message: format!(
                    "Must be positive, got {}",
                    self.classifier.softmax_temperature
                ),
            });
        }

        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if self.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_sessions".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }
        if self.session.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.timeout_secs".to_string(),
                message: "Session timeout cannot be 0".to_string(),
            });
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.sweep_interval_secs".to_string(),
                message: "Sweep interval cannot be 0".to_string(),
            });
        }
        Ok(())
    }

    fn validate_semantic(&self) -> Result<(), ConfigError> {
        let sem = &self.semantic;
        if !(0.0..=1.0).contains(&sem.similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "semantic.similarity_threshold".to_string(),
                message: format!(
                    "Must be between 0.0 and 1.0, got {}",
                    sem.similarity_threshold
                ),
            });
        }
        if sem.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "semantic.top_k".to_string(),
                message: "top_k cannot be 0".to_string(),
            });
        }
        if sem.embedding_dim == 0 {
            return Err(ConfigError::InvalidValue {
                field: "semantic.embedding_dim".to_string(),
                message: "embedding_dim cannot be 0".to_string(),
            });
        }
        Ok(())
    }

    fn validate_fallback(&self) -> Result<(), ConfigError> {
        let fb = &self.fallback;
        if !fb.enabled {
            return Ok(());
        }
        if fb.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("fallback.endpoint".to_string()));
        }
        if fb.model.trim().is_empty() {
            return Err(ConfigError::MissingField("fallback.model".to_string()));
        }
        if fb.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fallback.timeout_secs".to_string(),
                message: "Timeout cannot be 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Dialogue engine thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rule_override_confidence: f32,
    pub menu_token_confidence: f32,
    pub escalation_confidence: f32,
    pub token_match_threshold: f32,
    pub verify_match_threshold: f32,
    pub min_token_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_override_confidence: classification::RULE_OVERRIDE_CONFIDENCE,
            menu_token_confidence: classification::MENU_TOKEN_CONFIDENCE,
            escalation_confidence: escalation::MIN_CONFIDENCE,
            token_match_threshold: extraction::TOKEN_MATCH_THRESHOLD,
            verify_match_threshold: extraction::VERIFY_MATCH_THRESHOLD,
            min_token_chars: extraction::MIN_TOKEN_CHARS,
        }
    }
}

/// Statistical intent model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Serialized model; a missing or corrupt file means rules only
    pub model_path: Option<String>,
    /// Train from the bundled corpus when no model path is set
    pub train_bundled: bool,
    pub softmax_temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            train_bundled: true,
            softmax_temperature: classification::SOFTMAX_TEMPERATURE,
        }
    }
}

/// Session store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// History turns sent to the fallback
    pub fallback_history_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: session::MAX_SESSIONS,
            timeout_secs: session::TIMEOUT_SECS,
            sweep_interval_secs: session::SWEEP_INTERVAL_SECS,
            fallback_history_turns: session::FALLBACK_HISTORY_TURNS,
        }
    }
}

/// Template matching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub similarity_threshold: f32,
    pub top_k: usize,
    pub embedding_dim: usize,
    /// Template file; the bundled set is used when unset
    pub templates_path: Option<String>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: semantic::SIMILARITY_THRESHOLD,
            top_k: semantic::TOP_K,
            embedding_dim: semantic::EMBEDDING_DIM,
            templates_path: None,
        }
    }
}

/// OpenAI-compatible fallback endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: endpoints::OPENAI_DEFAULT.to_string(),
            model: endpoints::DEFAULT_MODEL.to_string(),
            api_key_env: endpoints::API_KEY_ENV.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 100,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (KIOSK_AGENT__ prefix, `__` between sections)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("KIOSK_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.session.max_sessions, 1000);
        assert_eq!(settings.session.timeout_secs, 3600);
        assert!((settings.engine.escalation_confidence - 0.3).abs() < f32::EPSILON);
        assert!(settings.fallback.enabled);
        assert!(settings.menu_path.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_engine_threshold_bounds() {
        let mut settings = Settings::default();
        settings.engine.rule_override_confidence = 1.5;
        assert!(settings.validate_engine().is_err());

        settings.engine.rule_override_confidence = 0.8;
        settings.engine.min_token_chars = 0;
        assert!(settings.validate_engine().is_err());

        settings.engine.min_token_chars = 2;
        assert!(settings.validate_engine().is_ok());
    }

    #[test]
    fn test_session_validation() {
        let mut settings = Settings::default();
        settings.session.timeout_secs = 0;
        assert!(settings.validate_session().is_err());
        settings.session.timeout_secs = 60;

        settings.session.max_sessions = 0;
        assert!(settings.validate_session().is_err());
        settings.session.max_sessions = 10;

        assert!(settings.validate_session().is_ok());
    }

    #[test]
    fn test_semantic_validation() {
        let mut settings = Settings::default();
        settings.semantic.similarity_threshold = -0.1;
        assert!(settings.validate_semantic().is_err());
        settings.semantic.similarity_threshold = 0.8;

        settings.semantic.top_k = 0;
        assert!(settings.validate_semantic().is_err());
    }

    #[test]
    fn test_disabled_fallback_skips_validation() {
        let mut settings = Settings::default();
        settings.fallback.endpoint = String::new();
        assert!(settings.validate_fallback().is_err());

        settings.fallback.enabled = false;
        assert!(settings.validate_fallback().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
session:
  timeout_secs: 120
observability:
  log_json: true
messages:
  greeting: "어서 오세요!"
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.session.timeout_secs, 120);
        assert_eq!(settings.session.max_sessions, 1000);
        assert!(settings.observability.log_json);
        assert_eq!(settings.observability.log_level, "info");
        assert_eq!(settings.messages.greeting, "어서 오세요!");
        assert_eq!(
            settings.messages.order_complete,
            DialogueMessages::default().order_complete
        );
    }
}
