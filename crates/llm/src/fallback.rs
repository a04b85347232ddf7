//! `GenerativeFallback` over an LLM backend
//!
//! The model is asked for a JSON object but replies are often wrapped in
//! prose or code fences, so the first `{ ... }` span is extracted before
//! parsing. Prices in the reply are kept only for logging; the dialogue
//! engine recomputes totals from the catalog.

use std::sync::Arc;

use async_trait::async_trait;
use kiosk_agent_core::{
    Error, FallbackContext, FallbackItem, FallbackResult, GenerativeFallback, MenuCatalog,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::backend::LlmBackend;
use crate::prompt::FallbackPromptBuilder;

static JSON_OBJECT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").ok());

/// Reply shape requested in the system prompt. Every field is optional so
/// that partially filled replies still parse.
#[derive(Debug, Deserialize)]
struct RawReply {
    is_order_related: Option<bool>,
    greeting_response: Option<String>,
    #[serde(default)]
    items: Vec<RawItem>,
    total_price: Option<f64>,
    special_requests: Option<String>,
    #[serde(default)]
    clarification_items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    name: String,
    quantity: Option<u32>,
    #[serde(default)]
    options: Vec<String>,
}

/// Parse a model reply into a [`FallbackResult`]
pub fn parse_fallback_reply(reply: &str) -> kiosk_agent_core::Result<FallbackResult> {
    let trimmed = reply.trim();
    let json = if trimmed.starts_with('{') && trimmed.ends_with('}') {
        trimmed
    } else {
        (*JSON_OBJECT)
            .as_ref()
            .and_then(|re| re.find(trimmed))
            .map(|m| m.as_str())
            .ok_or_else(|| {
                Error::MalformedFallbackResponse("no JSON object in reply".to_string())
            })?
    };

    let raw: RawReply = serde_json::from_str(json)?;
    Ok(FallbackResult {
        is_order_related: raw.is_order_related.unwrap_or(true),
        items: raw
            .items
            .into_iter()
            .filter(|item| !item.name.trim().is_empty())
            .map(|item| FallbackItem {
                name: item.name.trim().to_string(),
                quantity: item.quantity.unwrap_or(1).max(1),
                options: item.options,
            })
            .collect(),
        total_price: raw.total_price.map(|p| p.round() as i64).unwrap_or(0),
        special_requests: raw.special_requests.unwrap_or_default(),
        clarification_items: raw
            .clarification_items
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect(),
        casual_reply: raw.greeting_response.filter(|r| !r.trim().is_empty()),
    })
}

/// LLM-backed generative fallback
pub struct LlmFallback {
    backend: Arc<dyn LlmBackend>,
    catalog: Arc<dyn MenuCatalog>,
}

impl LlmFallback {
    pub fn new(backend: Arc<dyn LlmBackend>, catalog: Arc<dyn MenuCatalog>) -> Self {
        Self { backend, catalog }
    }
}

#[async_trait]
impl GenerativeFallback for LlmFallback {
    async fn invoke(&self, context: &FallbackContext) -> kiosk_agent_core::Result<FallbackResult> {
        let messages = FallbackPromptBuilder::new(self.catalog.as_ref()).build(context);
        tracing::debug!(
            session_id = %context.session_id,
            reason = %context.reason,
            messages = messages.len(),
            "Invoking generative fallback"
        );

        let generation = self.backend.generate(&messages).await?;
        let result = parse_fallback_reply(&generation.text).map_err(|e| {
            tracing::warn!(
                session_id = %context.session_id,
                error = %e,
                reply = %generation.text,
                "Unparseable fallback reply"
            );
            e
        })?;

        tracing::debug!(
            session_id = %context.session_id,
            order_related = result.is_order_related,
            items = result.items.len(),
            reported_total = result.total_price,
            latency_ms = generation.total_time_ms,
            "Fallback reply parsed"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        self.backend.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerationResult;
    use crate::prompt::Message;
    use crate::LlmError;
    use kiosk_agent_config::StaticMenuCatalog;
    use kiosk_agent_core::{EscalationReason, OrderState};

    struct CannedBackend {
        reply: Result<String, String>,
    }

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
            match &self.reply {
                Ok(text) => Ok(GenerationResult {
                    text: text.clone(),
                    tokens: 0,
                    total_time_ms: 1,
                }),
                Err(e) => Err(LlmError::Network(e.clone())),
            }
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn fallback(reply: Result<&str, &str>) -> LlmFallback {
        LlmFallback::new(
            Arc::new(CannedBackend {
                reply: reply.map(str::to_string).map_err(str::to_string),
            }),
            Arc::new(StaticMenuCatalog::cafe_default()),
        )
    }

    fn context() -> FallbackContext {
        FallbackContext {
            session_id: "s1".to_string(),
            utterance: "오늘 날씨 어때요".to_string(),
            reason: EscalationReason::Unrecognized,
            current_order: OrderState::new(),
            pending_clarifications: vec![],
            history: vec![],
            menu: vec![],
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let result = parse_fallback_reply(
            r#"{"is_order_related": true, "items": [{"name": "카페라떼", "quantity": 2, "options": ["아이스"]}], "total_price": 10000, "special_requests": "", "clarification_items": []}"#,
        )
        .unwrap();
        assert!(result.is_order_related);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].quantity, 2);
        assert_eq!(result.total_price, 10000);
        assert_eq!(result.casual_reply, None);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let reply = "분석 결과입니다.\n```json\n{\"is_order_related\": false, \"greeting_response\": \"맑고 화창해요!\", \"items\": []}\n```";
        let result = parse_fallback_reply(reply).unwrap();
        assert!(!result.is_order_related);
        assert_eq!(result.casual_reply.as_deref(), Some("맑고 화창해요!"));
    }

    #[test]
    fn test_parse_lenient_fields() {
        let result = parse_fallback_reply(
            r#"{"items": [{"name": "티라미수"}, {"name": "  "}], "total_price": 6500.0, "special_requests": null}"#,
        )
        .unwrap();
        assert!(result.is_order_related);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].quantity, 1);
        assert_eq!(result.total_price, 6500);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_fallback_reply("죄송합니다, 이해하지 못했어요."),
            Err(Error::MalformedFallbackResponse(_))
        ));
        assert!(matches!(
            parse_fallback_reply("{\"items\": [}"),
            Err(Error::MalformedFallbackResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_parses_reply() {
        let fallback = fallback(Ok(
            r#"{"is_order_related": false, "greeting_response": "좋은 하루예요!"}"#,
        ));
        let result = fallback.invoke(&context()).await.unwrap();
        assert_eq!(result.casual_reply.as_deref(), Some("좋은 하루예요!"));
        assert_eq!(fallback.name(), "canned");
    }

    #[tokio::test]
    async fn test_invoke_reports_transport_failure() {
        let err = fallback(Err("connection reset")).invoke(&context()).await.unwrap_err();
        assert!(matches!(err, Error::Fallback(_)));
    }

    #[tokio::test]
    async fn test_invoke_reports_malformed_reply() {
        let err = fallback(Ok("nope")).invoke(&context()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedFallbackResponse(_)));
    }
}
