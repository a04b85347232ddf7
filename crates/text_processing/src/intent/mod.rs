//! Intent classification
//!
//! Hybrid classifier: a weighted regex matcher ([`RuleMatcher`]) arbitrated
//! against a TF-IDF centroid model ([`IntentModel`]).
//!
//! Arbitration:
//! - blank input → `{casual, 0.0}`
//! - rule confidence above the override threshold → rule result
//! - otherwise the more confident result wins; ties and a missing model
//!   keep the rule result
//!
//! A token naming a catalog item forces an order intent when the rules
//! picked order or casual, so "아메리카노" alone is an order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kiosk_agent_config::{EngineConfig, StaticMenuCatalog};
//! use kiosk_agent_core::Intent;
//! use kiosk_agent_text_processing::IntentClassifier;
//!
//! let classifier = IntentClassifier::rule_only(
//!     Arc::new(StaticMenuCatalog::cafe_default()),
//!     &EngineConfig::default(),
//! );
//! assert_eq!(classifier.classify("안녕하세요").intent, Intent::Greeting);
//! assert_eq!(classifier.classify("아메리카노").intent, Intent::Order);
//! ```

pub mod rules;
pub mod statistical;

use std::sync::Arc;

use kiosk_agent_config::{ClassifierConfig, EngineConfig};
use kiosk_agent_core::{ClassificationResult, Intent, MenuCatalog};
use parking_lot::RwLock;

use crate::korean;

pub use rules::{detect_response_cue, ResponseCue, RuleMatcher};
pub use statistical::{IntentModel, TrainingCorpus, TrainingExample};

/// Rule + statistical intent classifier
pub struct IntentClassifier {
    rules: RuleMatcher,
    model: RwLock<Option<Arc<IntentModel>>>,
    catalog: Arc<dyn MenuCatalog>,
    rule_override: f32,
    menu_token_confidence: f32,
    min_token_chars: usize,
}

impl IntentClassifier {
    pub fn new(
        catalog: Arc<dyn MenuCatalog>,
        model: Option<IntentModel>,
        engine: &EngineConfig,
    ) -> Self {
        Self {
            rules: RuleMatcher::new(),
            model: RwLock::new(model.map(Arc::new)),
            catalog,
            rule_override: engine.rule_override_confidence,
            menu_token_confidence: engine.menu_token_confidence,
            min_token_chars: engine.min_token_chars,
        }
    }

    /// Classifier without a statistical model
    pub fn rule_only(catalog: Arc<dyn MenuCatalog>, engine: &EngineConfig) -> Self {
        Self::new(catalog, None, engine)
    }

    /// Build from settings: load the configured model file, else train the
    /// bundled corpus when enabled, else run rules only.
    pub fn from_settings(
        catalog: Arc<dyn MenuCatalog>,
        classifier: &ClassifierConfig,
        engine: &EngineConfig,
    ) -> Self {
        let model = match &classifier.model_path {
            Some(path) => match IntentModel::load(path) {
                Ok(model) => {
                    tracing::info!(
                        path = %path,
                        vocabulary = model.vocabulary_size(),
                        "Loaded intent model"
                    );
                    Some(model)
                },
                Err(e) => {
                    let err = kiosk_agent_core::Error::from(e);
                    tracing::warn!(path = %path, error = %err, "Intent model unavailable, using rules only");
                    None
                },
            },
            None if classifier.train_bundled => {
                match IntentModel::train_bundled(&catalog.names(), classifier.softmax_temperature)
                {
                    Ok(model) => {
                        tracing::info!(
                            vocabulary = model.vocabulary_size(),
                            "Trained bundled intent model"
                        );
                        Some(model)
                    },
                    Err(e) => {
                        let err = kiosk_agent_core::Error::from(e);
                        tracing::warn!(error = %err, "Intent model unavailable, using rules only");
                        None
                    },
                }
            },
            None => {
                tracing::info!("No intent model configured, using rules only");
                None
            },
        };
        Self::new(catalog, model, engine)
    }

    /// Swap the statistical model at runtime
    pub fn set_model(&self, model: Option<IntentModel>) {
        *self.model.write() = model.map(Arc::new);
    }

    pub fn has_model(&self) -> bool {
        self.model.read().is_some()
    }

    /// Classify an utterance. Never fails.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text = text.trim();
        if text.is_empty() {
            return ClassificationResult::unknown();
        }

        let rule = self.classify_rules(text);
        if rule.confidence > self.rule_override {
            tracing::debug!(intent = %rule.intent, confidence = rule.confidence, "Rule override");
            return rule;
        }

        let model = self.model.read().clone();
        let Some(model) = model else {
            return rule;
        };

        let statistical = model.predict(text);
        tracing::debug!(
            rule_intent = %rule.intent,
            rule_confidence = rule.confidence,
            model_intent = %statistical.intent,
            model_confidence = statistical.confidence,
            "Intent arbitration"
        );
        if statistical.confidence > rule.confidence {
            statistical
        } else {
            rule
        }
    }

    /// Rule result with the catalog boost applied
    pub fn classify_rules(&self, text: &str) -> ClassificationResult {
        let result = self.rules.classify(text);
        if !matches!(result.intent, Intent::Order | Intent::Casual) {
            return result;
        }
        if self.names_menu_item(text) {
            return ClassificationResult::rule(
                Intent::Order,
                result.confidence.max(self.menu_token_confidence),
            );
        }
        result
    }

    /// Whether any token (or adjacent token pair) is an exact catalog name
    fn names_menu_item(&self, text: &str) -> bool {
        let normalized = korean::normalize(text);
        let words = korean::words(&normalized);

        let singles = words
            .iter()
            .filter(|w| w.chars().count() >= self.min_token_chars)
            .flat_map(|w| [w.to_string(), korean::strip_particle(w).to_string()]);
        let pairs = words
            .windows(2)
            .map(|pair| format!("{} {}", pair[0], korean::strip_particle(pair[1])));

        singles
            .chain(pairs)
            .any(|token| self.catalog.lookup(&token).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_agent_config::StaticMenuCatalog;
    use kiosk_agent_core::ClassificationSource;

    fn catalog() -> Arc<dyn MenuCatalog> {
        Arc::new(StaticMenuCatalog::cafe_default())
    }

    fn rule_only() -> IntentClassifier {
        IntentClassifier::rule_only(catalog(), &EngineConfig::default())
    }

    fn with_bundled_model() -> IntentClassifier {
        let model = IntentModel::train_bundled(&catalog().names(), 0.1).unwrap();
        IntentClassifier::new(catalog(), Some(model), &EngineConfig::default())
    }

    #[test]
    fn test_blank_input() {
        let result = with_bundled_model().classify("   ");
        assert_eq!(result.intent, Intent::Casual);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, ClassificationSource::Rule);
    }

    #[test]
    fn test_menu_token_boost() {
        let classifier = rule_only();

        let result = classifier.classify("아메리카노를");
        assert_eq!(result.intent, Intent::Order);
        assert!((result.confidence - 0.85).abs() < 1e-6);

        let result = classifier.classify("그린티 라떼");
        assert_eq!(result.intent, Intent::Order);
    }

    #[test]
    fn test_boost_does_not_override_greeting() {
        let result = rule_only().classify("안녕하세요 아메리카노");
        assert_eq!(result.intent, Intent::Greeting);
    }

    #[test]
    fn test_strong_rule_overrides_model() {
        let result = with_bundled_model().classify("안녕하세요");
        assert_eq!(result.intent, Intent::Greeting);
        assert_eq!(result.source, ClassificationSource::Rule);
    }

    #[test]
    fn test_model_used_when_rules_are_weak() {
        let classifier = with_bundled_model();
        // No rule pattern covers this; the model still sees greeting words
        let rule = classifier.classify_rules("반가운 손님");
        let result = classifier.classify("반가운 손님");
        assert!(result.confidence >= rule.confidence);
    }

    #[test]
    fn test_rule_only_without_model() {
        let classifier = rule_only();
        assert!(!classifier.has_model());
        assert_eq!(classifier.classify("음...").confidence, 0.0);

        classifier.set_model(IntentModel::train_bundled(&[], 0.1).ok());
        assert!(classifier.has_model());
    }

    #[test]
    fn test_from_settings_with_missing_model_file() {
        let config = ClassifierConfig {
            model_path: Some("/nonexistent/intent_model.json".to_string()),
            ..Default::default()
        };
        let classifier =
            IntentClassifier::from_settings(catalog(), &config, &EngineConfig::default());
        assert!(!classifier.has_model());
        assert_eq!(classifier.classify("안녕하세요").intent, Intent::Greeting);
    }

    #[test]
    fn test_from_settings_trains_bundled() {
        let config = ClassifierConfig::default();
        let classifier =
            IntentClassifier::from_settings(catalog(), &config, &EngineConfig::default());
        assert!(classifier.has_model());
    }
}
