//! Semantic response matching trait

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of canned responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Greeting,
    Farewell,
    Casual,
    AdditionalOrder,
    OrderComplete,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Greeting => "greeting",
            TemplateKind::Farewell => "farewell",
            TemplateKind::Casual => "casual",
            TemplateKind::AdditionalOrder => "additional_order",
            TemplateKind::OrderComplete => "order_complete",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canned response
///
/// `trigger` is the customer utterance the template is indexed by and
/// `text` is what the kiosk says back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub trigger: String,
    pub text: String,
    /// Similarity of the query to `trigger`, set by `find_similar`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Nearest-template lookup for conversational utterances
pub trait SemanticResponseMatcher: Send + Sync {
    /// Nearest template by embedding distance.
    ///
    /// Similarity is `1 / (1 + distance)`; only templates scoring at or above
    /// the matcher's threshold and matching `kind` (when given) are returned.
    fn find_similar(&self, text: &str, kind: Option<TemplateKind>) -> Option<ResponseTemplate>;

    /// Uniformly random template of a kind
    fn random_by_type(&self, kind: TemplateKind) -> Option<ResponseTemplate>;
}
