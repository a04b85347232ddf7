//! Core traits and types for the kiosk ordering agent
//!
//! This crate provides foundational types used across all other crates:
//! - Intents and classification results
//! - Menu, option schema and order types
//! - The clarification queue and the per-session dialogue record
//! - Collaborator traits (catalog, semantic matcher, generative fallback)
//! - Error taxonomy

pub mod clarification;
pub mod conversation;
pub mod error;
pub mod intent;
pub mod menu;
pub mod order;
pub mod response;
pub mod similarity;
pub mod traits;

pub use clarification::ClarificationQueue;
pub use conversation::{ConversationTurn, DialogueSession, TurnRole};
pub use error::{Error, Result};
pub use intent::{ClassificationResult, ClassificationSource, Intent};
pub use menu::{
    categories, CatalogEntry, FuzzyMatch, MenuItem, MenuOption, OptionGroup, OptionsSchema,
};
pub use order::{OrderItem, OrderState};
pub use response::TurnResponse;

pub use traits::{
    EscalationReason, FallbackContext, FallbackItem, FallbackResult, GenerativeFallback,
    MenuCatalog, ResponseTemplate, SemanticResponseMatcher, TemplateKind,
};
