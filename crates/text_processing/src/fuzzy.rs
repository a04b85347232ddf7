//! Utterance-level fuzzy matching against menu names
//!
//! Used when no order template yields a verifiable candidate. Every content
//! token of the utterance, every adjacent token pair (for multi-word names)
//! and the whole normalized utterance are scored against every menu name
//! with [`name_similarity`].

use kiosk_agent_config::constants::extraction;
use kiosk_agent_config::EngineConfig;
use kiosk_agent_core::similarity::name_similarity;
use kiosk_agent_core::FuzzyMatch;

use crate::korean;

/// Configuration for utterance matching
#[derive(Debug, Clone)]
pub struct MenuMatchConfig {
    /// Minimum similarity to accept a match
    pub threshold: f32,
    /// Tokens shorter than this (in characters) are skipped
    pub min_token_chars: usize,
}

impl Default for MenuMatchConfig {
    fn default() -> Self {
        Self {
            threshold: extraction::TOKEN_MATCH_THRESHOLD,
            min_token_chars: extraction::MIN_TOKEN_CHARS,
        }
    }
}

impl From<&EngineConfig> for MenuMatchConfig {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            threshold: engine.token_match_threshold,
            min_token_chars: engine.min_token_chars,
        }
    }
}

/// Finds the menu name an utterance most likely refers to
#[derive(Debug, Clone, Default)]
pub struct MenuMatcher {
    config: MenuMatchConfig,
}

impl MenuMatcher {
    pub fn new(config: MenuMatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MenuMatchConfig {
        &self.config
    }

    /// Best menu name for `text`, or `None` below the threshold.
    ///
    /// Tokens are only scored against names they contain or are contained
    /// in; the whole utterance is scored against every name. When nothing
    /// clears the threshold, a name appearing verbatim in the utterance is
    /// still accepted (the longest one).
    pub fn best_match(&self, text: &str, names: &[String]) -> Option<FuzzyMatch> {
        let processed = korean::normalize(text);
        if processed.is_empty() || names.is_empty() {
            return None;
        }

        let tokens = self.candidate_tokens(&processed);
        let mut best: Option<FuzzyMatch> = None;
        let mut consider = |name: &str, score: f32| {
            if score >= self.config.threshold && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    name: name.to_string(),
                    score,
                });
            }
        };

        for name in names {
            let lowered = name.to_lowercase();
            for token in &tokens {
                if lowered.contains(token.as_str()) || token.contains(lowered.as_str()) {
                    consider(name, name_similarity(token, name));
                }
            }
            consider(name, name_similarity(&processed, name));
        }

        if best.is_some() {
            return best;
        }

        names
            .iter()
            .filter(|name| processed.contains(name.to_lowercase().as_str()))
            .max_by_key(|name| name.chars().count())
            .map(|name| FuzzyMatch {
                name: name.clone(),
                score: name_similarity(&processed, name),
            })
    }

    /// Particle-stripped tokens plus adjacent pairs
    fn candidate_tokens(&self, processed: &str) -> Vec<String> {
        let words = korean::words(processed);
        let mut tokens = korean::content_tokens(processed, self.config.min_token_chars);
        tokens.extend(
            words
                .windows(2)
                .map(|pair| format!("{} {}", pair[0], korean::strip_particle(pair[1]))),
        );
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["아메리카노", "카페라떼", "그린티 라떼", "캐모마일", "티라미수", "치즈케이크"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_partial_token_accepted() {
        let matcher = MenuMatcher::default();
        let m = matcher.best_match("아메리카 주세요", &names()).unwrap();
        assert_eq!(m.name, "아메리카노");
        assert!((m.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_particle_stripped_before_scoring() {
        let matcher = MenuMatcher::default();
        let m = matcher.best_match("캐모마일을 마실게요", &names()).unwrap();
        assert_eq!(m.name, "캐모마일");
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_multi_word_name_via_whole_utterance() {
        let matcher = MenuMatcher::default();
        let m = matcher.best_match("그린티 라떼 주세요", &names()).unwrap();
        assert_eq!(m.name, "그린티 라떼");
    }

    #[test]
    fn test_below_threshold_rejected() {
        let matcher = MenuMatcher::new(MenuMatchConfig {
            threshold: 0.5,
            ..Default::default()
        });
        // "아메" covers 2 of 5 characters
        assert!(matcher.best_match("아메 주세요", &names()).is_none());
        assert!(matcher.best_match("화장실 어디예요", &names()).is_none());
    }
}
