//! Escalation gate
//!
//! Decides whether a planned turn is committed locally or handed to the
//! generative fallback.

use kiosk_agent_config::EngineConfig;
use kiosk_agent_core::{ClassificationResult, EscalationReason};

use crate::clarification::EngineOutcome;

/// Where a turn is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Local,
    Escalate(EscalationReason),
}

impl GateDecision {
    pub fn is_local(&self) -> bool {
        matches!(self, GateDecision::Local)
    }
}

#[derive(Debug, Clone)]
pub struct EscalationGate {
    min_confidence: f32,
}

impl EscalationGate {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn from_settings(engine: &EngineConfig) -> Self {
        Self::new(engine.escalation_confidence)
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// A semantic template hit is always local. Otherwise low confidence
    /// escalates before the outcome is looked at.
    pub fn decide(
        &self,
        classification: &ClassificationResult,
        outcome: &EngineOutcome,
    ) -> GateDecision {
        if outcome.is_semantic_hit() {
            return GateDecision::Local;
        }
        if classification.confidence < self.min_confidence {
            return GateDecision::Escalate(EscalationReason::LowConfidence);
        }
        match outcome {
            EngineOutcome::Handled { .. } => GateDecision::Local,
            EngineOutcome::Miss(_) => GateDecision::Escalate(EscalationReason::ExtractionMiss),
            EngineOutcome::Unrecognized => GateDecision::Escalate(EscalationReason::Unrecognized),
        }
    }
}

impl Default for EscalationGate {
    fn default() -> Self {
        Self::from_settings(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clarification::TurnPlan;
    use kiosk_agent_core::{ClarificationQueue, Error, Intent, OrderState, TurnResponse};

    fn handled(semantic_hit: bool) -> EngineOutcome {
        EngineOutcome::Handled {
            plan: TurnPlan {
                order: OrderState::new(),
                clarifications: ClarificationQueue::new(),
                response: TurnResponse::new(OrderState::new(), "ok"),
            },
            semantic_hit,
        }
    }

    #[test]
    fn test_confidence_boundary() {
        let gate = EscalationGate::default();
        assert_eq!(gate.min_confidence(), 0.3);

        let low = ClassificationResult::rule(Intent::Order, 0.29);
        assert_eq!(
            gate.decide(&low, &handled(false)),
            GateDecision::Escalate(EscalationReason::LowConfidence)
        );

        let enough = ClassificationResult::rule(Intent::Order, 0.31);
        assert!(gate.decide(&enough, &handled(false)).is_local());
    }

    #[test]
    fn test_semantic_hit_is_always_local() {
        let gate = EscalationGate::default();
        let low = ClassificationResult::rule(Intent::Casual, 0.1);
        assert!(gate.decide(&low, &handled(true)).is_local());
    }

    #[test]
    fn test_miss_and_unrecognized_escalate() {
        let gate = EscalationGate::default();
        let confident = ClassificationResult::rule(Intent::Order, 0.9);
        assert_eq!(
            gate.decide(
                &confident,
                &EngineOutcome::Miss(Error::ExtractionMiss("x".into()))
            ),
            GateDecision::Escalate(EscalationReason::ExtractionMiss)
        );
        assert_eq!(
            gate.decide(&confident, &EngineOutcome::Unrecognized),
            GateDecision::Escalate(EscalationReason::Unrecognized)
        );
    }
}
