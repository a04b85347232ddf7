//! Korean text processing for the kiosk agent
//!
//! This crate turns a customer utterance into structured signals:
//! - **Intent classification**: weighted rules arbitrated against a TF-IDF model
//! - **Order extraction**: ordered template cascade with catalog verification
//! - **Option extraction**: temperature, size, caffeine and topping phrases
//! - **Korean helpers**: particle stripping, number words, tokenization
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kiosk_agent_config::{EngineConfig, StaticMenuCatalog};
//! use kiosk_agent_core::Intent;
//! use kiosk_agent_text_processing::{IntentClassifier, OrderExtractor};
//!
//! let catalog = Arc::new(StaticMenuCatalog::cafe_default());
//! let engine = EngineConfig::default();
//! let classifier = IntentClassifier::rule_only(catalog.clone(), &engine);
//! let extractor = OrderExtractor::new(catalog, &engine);
//!
//! let text = "카페라떼 두잔 주세요";
//! assert_eq!(classifier.classify(text).intent, Intent::Order);
//! assert_eq!(extractor.extract_order(text).unwrap().quantity, 2);
//! ```

pub mod extraction;
pub mod fuzzy;
pub mod intent;
pub mod korean;

mod error;

pub use error::{Result, TextProcessingError};

pub use extraction::{extract_options, OptionChange, OrderCandidate, OrderExtractor};
pub use fuzzy::{MenuMatchConfig, MenuMatcher};
pub use intent::{
    detect_response_cue, IntentClassifier, IntentModel, ResponseCue, RuleMatcher,
    TrainingCorpus, TrainingExample,
};
