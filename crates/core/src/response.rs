//! Caller-facing turn response

use serde::{Deserialize, Serialize};

use crate::order::OrderState;

/// What the caller receives for every utterance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnResponse {
    pub order: OrderState,
    pub message: String,
    pub needs_clarification: bool,
    /// Only the head of the clarification queue is exposed
    pub clarification_items: Vec<String>,
    pub is_casual_conversation: bool,
    #[serde(default)]
    pub order_complete: bool,
    #[serde(default)]
    pub asking_for_more_items: bool,
    /// Whether the generative fallback produced this turn
    #[serde(default)]
    pub escalated: bool,
}

impl TurnResponse {
    pub fn new(order: OrderState, message: impl Into<String>) -> Self {
        Self {
            order,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Expose the queue head, if any
    pub fn with_clarification(mut self, head: Option<&str>) -> Self {
        self.clarification_items = head.map(|h| vec![h.to_string()]).unwrap_or_default();
        self.needs_clarification = !self.clarification_items.is_empty();
        self
    }

    pub fn casual(mut self) -> Self {
        self.is_casual_conversation = true;
        self
    }
}
