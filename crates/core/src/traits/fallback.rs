//! Generative fallback trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conversation::ConversationTurn;
use crate::menu::CatalogEntry;
use crate::order::OrderState;
use crate::Result;

/// Why a turn left the local engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Classifier confidence under the escalation threshold
    LowConfidence,
    /// Order-related intent but no structured change could be extracted
    ExtractionMiss,
    /// No local handler recognised the turn
    Unrecognized,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::LowConfidence => "low_confidence",
            EscalationReason::ExtractionMiss => "extraction_miss",
            EscalationReason::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session snapshot handed to the fallback
#[derive(Debug, Clone, Serialize)]
pub struct FallbackContext {
    pub session_id: String,
    pub utterance: String,
    pub reason: EscalationReason,
    pub current_order: OrderState,
    pub pending_clarifications: Vec<String>,
    pub history: Vec<ConversationTurn>,
    pub menu: Vec<CatalogEntry>,
}

/// One item proposed by the fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Structured fallback answer; prices and missing options are recomputed
/// locally, so they are not part of this type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FallbackResult {
    pub is_order_related: bool,
    #[serde(default)]
    pub items: Vec<FallbackItem>,
    #[serde(default)]
    pub total_price: i64,
    #[serde(default)]
    pub special_requests: String,
    #[serde(default)]
    pub clarification_items: Vec<String>,
    #[serde(default)]
    pub casual_reply: Option<String>,
}

/// External generative model consulted for escalated turns
#[async_trait]
pub trait GenerativeFallback: Send + Sync {
    /// Analyse the escalated turn.
    ///
    /// Unparseable model output is reported as
    /// `Error::MalformedFallbackResponse`; the caller substitutes a safe
    /// default rather than failing the turn.
    async fn invoke(&self, context: &FallbackContext) -> Result<FallbackResult>;

    /// Name for logging
    fn name(&self) -> &str;
}
