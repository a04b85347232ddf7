//! Kiosk dialogue agent
//!
//! Features:
//! - Clarification state machine over a FIFO question queue
//! - Escalation gate between local handling and the generative fallback
//! - Per-session serialized turns with idle expiry
//! - Fail-open pipeline: every utterance gets an answer

pub mod clarification;
pub mod escalation;
pub mod pipeline;
pub mod session;

pub use clarification::{ClarificationEngine, DialogueState, EngineOutcome, TurnPlan};
pub use escalation::{EscalationGate, GateDecision};
pub use pipeline::{DialoguePipeline, PipelineComponents, SessionTurn};
pub use session::{SessionHandle, SessionManager};
