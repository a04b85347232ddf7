//! Dialogue pipeline
//!
//! One utterance flows through classify → plan → gate → commit or escalate.
//! Every turn produces a system utterance; collaborator failures degrade to
//! a safe response and are never surfaced to the caller.

use std::sync::Arc;

use kiosk_agent_config::{DialogueMessages, Settings, StaticMenuCatalog};
use kiosk_agent_core::{
    ConversationTurn, DialogueSession, EscalationReason, FallbackContext, GenerativeFallback,
    MenuCatalog, Result, SemanticResponseMatcher, TurnResponse,
};
use kiosk_agent_llm::{LlmFallback, OpenAIBackend, OpenAIConfig};
use kiosk_agent_rag::TemplateIndex;
use kiosk_agent_text_processing::{IntentClassifier, OrderExtractor};
use serde::{Deserialize, Serialize};

use crate::clarification::{ClarificationEngine, EngineOutcome};
use crate::escalation::{EscalationGate, GateDecision};
use crate::session::SessionManager;

/// A turn's response together with the session it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub session_id: String,
    #[serde(flatten)]
    pub response: TurnResponse,
}

/// Shared services for building a pipeline by hand
pub struct PipelineComponents {
    pub catalog: Arc<dyn MenuCatalog>,
    pub classifier: Arc<IntentClassifier>,
    pub matcher: Arc<dyn SemanticResponseMatcher>,
    pub fallback: Option<Arc<dyn GenerativeFallback>>,
}

pub struct DialoguePipeline {
    classifier: Arc<IntentClassifier>,
    engine: ClarificationEngine,
    gate: EscalationGate,
    fallback: Option<Arc<dyn GenerativeFallback>>,
    catalog: Arc<dyn MenuCatalog>,
    sessions: Arc<SessionManager>,
    history_turns: usize,
}

impl DialoguePipeline {
    pub fn new(components: PipelineComponents, settings: &Settings) -> Self {
        let extractor = Arc::new(OrderExtractor::new(
            Arc::clone(&components.catalog),
            &settings.engine,
        ));
        let engine = ClarificationEngine::new(
            extractor,
            components.matcher,
            settings.messages.clone(),
            &settings.engine,
        );
        Self {
            classifier: components.classifier,
            engine,
            gate: EscalationGate::from_settings(&settings.engine),
            fallback: components.fallback,
            catalog: components.catalog,
            sessions: Arc::new(SessionManager::from_settings(&settings.session)),
            history_turns: settings.session.fallback_history_turns,
        }
    }

    /// Build every collaborator from settings.
    ///
    /// A missing statistical model means rule-only classification and a
    /// fallback that cannot be configured is disabled; both are logged.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let catalog: Arc<dyn MenuCatalog> = Arc::new(StaticMenuCatalog::from_path_or_default(
            settings.menu_path.as_deref(),
        )?);
        let classifier = Arc::new(IntentClassifier::from_settings(
            Arc::clone(&catalog),
            &settings.classifier,
            &settings.engine,
        ));
        let matcher: Arc<dyn SemanticResponseMatcher> =
            Arc::new(TemplateIndex::from_settings(&settings.semantic)?);

        let fallback: Option<Arc<dyn GenerativeFallback>> = if settings.fallback.enabled {
            match OpenAIBackend::new(OpenAIConfig::from_settings(&settings.fallback)) {
                Ok(backend) => Some(Arc::new(LlmFallback::new(
                    Arc::new(backend),
                    Arc::clone(&catalog),
                ))),
                Err(e) => {
                    tracing::warn!(error = %e, "Generative fallback disabled");
                    None
                },
            }
        } else {
            None
        };

        tracing::info!(
            menu_items = catalog.all_items().len(),
            statistical_model = classifier.has_model(),
            fallback = fallback.as_ref().map(|f| f.name()).unwrap_or("none"),
            "Dialogue pipeline ready"
        );

        Ok(Self::new(
            PipelineComponents {
                catalog,
                classifier,
                matcher,
                fallback,
            },
            settings,
        ))
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn messages(&self) -> &DialogueMessages {
        self.engine.messages()
    }

    /// Handle an utterance, creating the session when it does not exist
    pub async fn handle_utterance(
        &self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<SessionTurn> {
        let handle = self.sessions.get_or_create(session_id)?;
        handle.touch();
        let mut session = handle.lock().await;
        let response = self.run_turn(&mut session, text).await;
        handle.touch();
        Ok(SessionTurn {
            session_id: handle.id.clone(),
            response,
        })
    }

    /// Answer the pending clarification of an existing session
    pub async fn respond_to_clarification(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SessionTurn> {
        let handle = self.sessions.require(session_id)?;
        handle.touch();
        let mut session = handle.lock().await;
        let response = self.run_turn(&mut session, text).await;
        handle.touch();
        Ok(SessionTurn {
            session_id: handle.id.clone(),
            response,
        })
    }

    async fn run_turn(&self, session: &mut DialogueSession, text: &str) -> TurnResponse {
        let text = text.trim();
        let classification = self.classifier.classify(text);
        let outcome = self.engine.plan_turn(session, text, &classification);
        let decision = self.gate.decide(&classification, &outcome);

        metrics::counter!("kiosk_agent_turns_total", "intent" => classification.intent.as_str())
            .increment(1);
        tracing::debug!(
            session_id = %session.id,
            intent = %classification.intent,
            confidence = classification.confidence,
            source = ?classification.source,
            decision = ?decision,
            "Turn classified"
        );

        let response = match (decision, outcome) {
            (GateDecision::Local, EngineOutcome::Handled { plan, .. }) => {
                session.order = plan.order;
                session.clarifications = plan.clarifications;
                plan.response
            },
            (GateDecision::Escalate(reason), _) => self.escalate(session, text, reason).await,
            (GateDecision::Local, _) => {
                self.escalate(session, text, EscalationReason::Unrecognized)
                    .await
            },
        };

        session.record(ConversationTurn::user(text));
        session.record(ConversationTurn::assistant(response.message.clone()));
        response
    }

    async fn escalate(
        &self,
        session: &mut DialogueSession,
        text: &str,
        reason: EscalationReason,
    ) -> TurnResponse {
        metrics::counter!("kiosk_agent_escalations_total", "reason" => reason.as_str())
            .increment(1);

        let Some(fallback) = self.fallback.as_ref() else {
            tracing::debug!(session_id = %session.id, %reason, "No fallback configured");
            return self.safe_default(session, &self.engine.messages().casual);
        };

        let context = FallbackContext {
            session_id: session.id.clone(),
            utterance: text.to_string(),
            reason,
            current_order: session.order.clone(),
            pending_clarifications: session
                .clarifications
                .pending()
                .map(str::to_string)
                .collect(),
            history: session.recent_history(self.history_turns).to_vec(),
            menu: self.catalog.all_items(),
        };

        match fallback.invoke(&context).await {
            Ok(result) => {
                let plan = self.engine.merge_fallback(session, &result);
                session.order = plan.order;
                session.clarifications = plan.clarifications;
                let mut response = plan.response;
                response.escalated = true;
                response
            },
            Err(e) => {
                metrics::counter!("kiosk_agent_fallback_failures_total").increment(1);
                tracing::warn!(
                    session_id = %session.id,
                    fallback = fallback.name(),
                    %reason,
                    error = %e,
                    "Fallback failed; answering with safe default"
                );
                let mut response =
                    self.safe_default(session, &self.engine.messages().fallback_error);
                response.escalated = true;
                response
            },
        }
    }

    /// Keep the order and queue, present the head question
    fn safe_default(&self, session: &DialogueSession, message: &str) -> TurnResponse {
        TurnResponse::new(session.order.clone(), message)
            .with_clarification(session.clarifications.head())
    }
}
