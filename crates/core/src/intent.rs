//! Intent labels and classification results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dialogue intents recognised per utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Ordering a menu item
    Order,
    /// Choosing or changing an option (temperature, size, ...)
    OptionSelection,
    Greeting,
    Farewell,
    /// Small talk, yes/no replies and anything unclassified
    Casual,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Order,
        Intent::OptionSelection,
        Intent::Greeting,
        Intent::Farewell,
        Intent::Casual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Order => "order",
            Intent::OptionSelection => "option_selection",
            Intent::Greeting => "greeting",
            Intent::Farewell => "farewell",
            Intent::Casual => "casual",
        }
    }

    /// Intents whose turns are expected to change the order
    pub fn is_order_related(&self) -> bool {
        matches!(self, Intent::Order | Intent::OptionSelection)
    }

    /// Intents that must never disturb the clarification queue
    pub fn is_conversational(&self) -> bool {
        matches!(self, Intent::Greeting | Intent::Farewell | Intent::Casual)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which matcher produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rule,
    Statistical,
}

/// Arbitrated classification of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    pub fn rule(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            source: ClassificationSource::Rule,
        }
    }

    pub fn statistical(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            source: ClassificationSource::Statistical,
        }
    }

    /// Result for empty or unmatched input
    pub fn unknown() -> Self {
        Self::rule(Intent::Casual, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_serde_names() {
        let json = serde_json::to_string(&Intent::OptionSelection).unwrap();
        assert_eq!(json, "\"option_selection\"");
        let parsed: Intent = serde_json::from_str("\"farewell\"").unwrap();
        assert_eq!(parsed, Intent::Farewell);
    }

    #[test]
    fn test_confidence_clamped() {
        let result = ClassificationResult::rule(Intent::Order, 1.4);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(ClassificationResult::unknown().intent, Intent::Casual);
    }
}
