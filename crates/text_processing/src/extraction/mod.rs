//! Order extraction
//!
//! Turns an utterance into a structured order change through an explicit
//! cascade:
//!
//! 1. Ordered order templates capture a candidate noun phrase (and a
//!    quantity when the template has one). The candidate is particle-stripped
//!    and verified against the catalog (exact, else fuzzy).
//! 2. When no template candidate verifies, the whole utterance is fuzzily
//!    matched against every menu name.
//! 3. The stage-2 name is verified the same way as a template candidate.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kiosk_agent_config::{EngineConfig, StaticMenuCatalog};
//! use kiosk_agent_text_processing::OrderExtractor;
//!
//! let extractor = OrderExtractor::new(
//!     Arc::new(StaticMenuCatalog::cafe_default()),
//!     &EngineConfig::default(),
//! );
//! let order = extractor.extract_order("아메리카노 두잔 주세요").unwrap();
//! assert_eq!(order.menu_name, "아메리카노");
//! assert_eq!(order.quantity, 2);
//! ```

pub mod options;

use std::sync::Arc;

use kiosk_agent_config::EngineConfig;
use kiosk_agent_core::{Error, MenuCatalog, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fuzzy::{MenuMatchConfig, MenuMatcher};
use crate::korean;

pub use options::extract_options;

/// Quantity expressions: digits with an optional counter, number words with
/// a counter, or bare native numerals. Bare 한/두/세/네 are excluded so that
/// "네" (yes) is never read as four.
const QTY: &str =
    r"\d+\s*(?:잔|개|컵)?|(?:한|두|세|네|다섯)\s*(?:잔|개|컵)|하나|둘|셋|넷|다섯";

const REQUEST_VERBS: &str = r"주세요|줘요|줘|주문할게요|주문할게|주문이요|주문하려고|부탁합니다|부탁해요|부탁드려요|부탁드립니다|먹고\s*싶어요?|마시고\s*싶어요?|마실게요|먹을게요|원해요|원해|있나요|있어요";

struct OrderTemplate {
    name: &'static str,
    regex: Regex,
}

static ORDER_TEMPLATES: Lazy<Vec<OrderTemplate>> = Lazy::new(|| {
    let table = [
        (
            "counted",
            format!(r"^(?P<item>.+?)\s*(?P<qty>{QTY})(?:$|\s|[.!?,]|이요|요|이랑|랑|만)"),
        ),
        (
            "choice",
            r"^(?P<item>.+?)(?:으로|로)\s*(?:할게요|할게|해\s*주세요|주세요|부탁합니다|부탁해요|부탁드려요|주문할게요)"
                .to_string(),
        ),
        (
            "request",
            format!(r"^(?P<item>.+?)\s*(?:을|를)?\s*(?:{REQUEST_VERBS})"),
        ),
        (
            "bare",
            r"^(?P<item>.+?)\s*(?:주문|이요|요)\s*[.!?]*$".to_string(),
        ),
    ];

    table
        .into_iter()
        .filter_map(|(name, pattern)| match Regex::new(&pattern) {
            Ok(regex) => Some(OrderTemplate { name, regex }),
            Err(e) => {
                tracing::warn!("Failed to compile order template {}: {}", name, e);
                None
            },
        })
        .collect()
});

static QUANTITY_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(QTY).ok());

/// A new order line derived from an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCandidate {
    /// Canonical catalog name
    pub menu_name: String,
    pub quantity: u32,
    pub options: Vec<String>,
}

/// An option mutation derived from an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChange {
    /// Menu item the utterance names, if any
    pub menu_name: Option<String>,
    pub options: Vec<String>,
}

/// Rule-based order and option extractor
pub struct OrderExtractor {
    catalog: Arc<dyn MenuCatalog>,
    matcher: MenuMatcher,
    verify_threshold: f32,
}

impl OrderExtractor {
    pub fn new(catalog: Arc<dyn MenuCatalog>, engine: &EngineConfig) -> Self {
        Self {
            catalog,
            matcher: MenuMatcher::new(MenuMatchConfig::from(engine)),
            verify_threshold: engine.verify_match_threshold,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn MenuCatalog> {
        &self.catalog
    }

    /// Extract a new order line
    pub fn extract_order(&self, text: &str) -> Result<OrderCandidate> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::ExtractionMiss("empty utterance".to_string()));
        }

        let mut resolved: Option<(String, Option<u32>)> = None;

        for template in ORDER_TEMPLATES.iter() {
            let Some(caps) = template.regex.captures(text) else {
                continue;
            };
            let Some(item) = caps.name("item") else {
                continue;
            };
            if let Some(name) = self.verify(item.as_str()) {
                let quantity = caps
                    .name("qty")
                    .and_then(|q| korean::word_to_quantity(q.as_str()));
                tracing::debug!(
                    template = template.name,
                    candidate = item.as_str(),
                    menu = %name,
                    "Order template matched"
                );
                resolved = Some((name, quantity));
                break;
            }
        }

        if resolved.is_none() {
            let names = self.catalog.names();
            if let Some(found) = self.matcher.best_match(text, &names) {
                if let Some(name) = self.verify(&found.name) {
                    tracing::debug!(menu = %name, score = found.score, "Fuzzy utterance match");
                    resolved = Some((name, None));
                }
            }
        }

        let (menu_name, quantity) =
            resolved.ok_or_else(|| Error::ExtractionMiss(text.to_string()))?;

        Ok(OrderCandidate {
            menu_name,
            quantity: quantity
                .or_else(|| Self::extract_quantity(text))
                .unwrap_or(1)
                .max(1),
            options: extract_options(text),
        })
    }

    /// Extract an option mutation for an existing line
    pub fn extract_option_change(&self, text: &str) -> Result<OptionChange> {
        let options = extract_options(text);
        if options.is_empty() {
            return Err(Error::ExtractionMiss(text.to_string()));
        }
        Ok(OptionChange {
            menu_name: self.referenced_menu(text),
            options,
        })
    }

    /// Canonical option names mentioned in `text`
    pub fn extract_options(&self, text: &str) -> Vec<String> {
        extract_options(text)
    }

    /// First quantity expression in `text`
    pub fn extract_quantity(text: &str) -> Option<u32> {
        (*QUANTITY_PATTERN)
            .as_ref()?
            .find_iter(text)
            .find_map(|m| korean::word_to_quantity(m.as_str()))
    }

    /// Menu item named in `text`: a catalog name contained verbatim (longest
    /// first), else a token that resolves fuzzily at the verification threshold
    pub fn referenced_menu(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        let verbatim = self
            .catalog
            .names()
            .into_iter()
            .filter(|name| lowered.contains(name.to_lowercase().as_str()))
            .max_by_key(|name| name.chars().count());
        if verbatim.is_some() {
            return verbatim;
        }

        korean::content_tokens(&lowered, self.matcher.config().min_token_chars)
            .iter()
            .filter_map(|token| self.catalog.lookup_fuzzy(token).ok())
            .filter(|m| m.score >= self.verify_threshold)
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|m| m.name)
    }

    /// Resolve a candidate phrase to a canonical catalog name
    fn verify(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }
        let stripped = korean::strip_particle(candidate);

        for form in [candidate, stripped] {
            if let Ok(item) = self.catalog.lookup(form) {
                return Some(item.name);
            }
        }

        match self.catalog.lookup_fuzzy(stripped) {
            Ok(m) if m.score >= self.verify_threshold => Some(m.name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_agent_config::StaticMenuCatalog;

    fn extractor() -> OrderExtractor {
        OrderExtractor::new(
            Arc::new(StaticMenuCatalog::cafe_default()),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_counted_request() {
        let order = extractor().extract_order("아메리카노 두잔 주세요").unwrap();
        assert_eq!(order.menu_name, "아메리카노");
        assert_eq!(order.quantity, 2);
        assert!(order.options.is_empty());
    }

    #[test]
    fn test_plain_request_defaults_to_one() {
        let order = extractor().extract_order("카페라떼 주세요").unwrap();
        assert_eq!(order.menu_name, "카페라떼");
        assert_eq!(order.quantity, 1);
    }

    #[test]
    fn test_particle_and_digits() {
        let order = extractor().extract_order("티라미수를 3개 주세요").unwrap();
        assert_eq!(order.menu_name, "티라미수");
        assert_eq!(order.quantity, 3);
    }

    #[test]
    fn test_choice_template() {
        let order = extractor().extract_order("캐모마일로 할게요").unwrap();
        assert_eq!(order.menu_name, "캐모마일");
    }

    #[test]
    fn test_options_carried_with_order() {
        let order = extractor()
            .extract_order("아이스 아메리카노 하나요")
            .unwrap();
        assert_eq!(order.menu_name, "아메리카노");
        assert_eq!(order.quantity, 1);
        assert_eq!(order.options, vec!["아이스"]);
    }

    #[test]
    fn test_multi_word_menu_name() {
        let order = extractor()
            .extract_order("차가운 그린티 라떼 큰 사이즈로 주세요")
            .unwrap();
        assert_eq!(order.menu_name, "그린티 라떼");
        assert_eq!(order.options, vec!["아이스", "라지"]);
    }

    #[test]
    fn test_partial_name_resolved() {
        let order = extractor().extract_order("아메리카 주세요").unwrap();
        assert_eq!(order.menu_name, "아메리카노");
    }

    #[test]
    fn test_weak_partial_name_found_by_utterance_match() {
        // "아메" fails template verification (0.4 < 0.5) but clears the
        // utterance-level threshold
        let order = extractor().extract_order("아메 주세요").unwrap();
        assert_eq!(order.menu_name, "아메리카노");
    }

    #[test]
    fn test_unknown_item_is_miss() {
        let err = extractor().extract_order("샌드위치 주세요").unwrap_err();
        assert!(matches!(err, Error::ExtractionMiss(_)));
    }

    #[test]
    fn test_option_only_utterance_is_miss() {
        assert!(extractor().extract_order("아이스로 주세요").is_err());
        assert!(extractor().extract_order("").is_err());
    }

    #[test]
    fn test_option_change() {
        let ex = extractor();
        let change = ex.extract_option_change("카페라떼는 라지로 바꿔주세요").unwrap();
        assert_eq!(change.menu_name.as_deref(), Some("카페라떼"));
        assert_eq!(change.options, vec!["라지"]);

        let change = ex.extract_option_change("아이스로 주세요").unwrap();
        assert_eq!(change.menu_name, None);
        assert_eq!(change.options, vec!["아이스"]);

        assert!(ex.extract_option_change("음 글쎄요").is_err());
    }

    #[test]
    fn test_quantity_scan() {
        assert_eq!(OrderExtractor::extract_quantity("두 잔이요"), Some(2));
        assert_eq!(OrderExtractor::extract_quantity("2컵"), Some(2));
        assert_eq!(OrderExtractor::extract_quantity("네 좋아요"), None);
    }
}
