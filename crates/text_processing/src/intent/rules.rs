//! Rule-based intent matching
//!
//! Pattern groups are scored independently. A match scores
//! `weight × (0.5 + 0.5 × matched_chars / utterance_chars)`, so longer
//! matches covering more of the utterance score higher. The best match
//! across all groups wins; on equal scores the earlier group wins.

use kiosk_agent_config::constants::classification;
use kiosk_agent_core::{ClassificationResult, Intent};
use once_cell::sync::Lazy;
use regex::Regex;

/// Yes/no answer detected in an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCue {
    Affirmative,
    Negative,
}

const AFFIRMATIVE: &str = r"(?i)^\s*(?:네|예|응|그래요?|좋아요?|좋습니다|맞아요?|맞습니다|오케이|ok|okay|ㅇㅋ|넵|옙|알겠어요?|알겠습니다|ㅇㅇ|웅|있어요|있습니다|더\s*주문할게요?)(?:\s|[.!?,~]|$)";

const NEGATIVE: &str = r"(?i)^\s*(?:아니요|아니오|아니에요|아뇨|아니|아닙니다|ㄴㄴ|싫어요?|별로|no|괜찮아요|괜찮습니다|됐어요|됐습니다|없어요|없습니다|그게\s*다(?:예요|에요)?|이게\s*다(?:예요|에요)?|그만|끝)(?:\s|[.!?,~]|$)";

static AFFIRMATIVE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(AFFIRMATIVE).ok());
static NEGATIVE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(NEGATIVE).ok());

/// Detect a yes/no answer at the start of the utterance
///
/// # Examples
/// ```
/// use kiosk_agent_text_processing::intent::{detect_response_cue, ResponseCue};
/// assert_eq!(detect_response_cue("네"), Some(ResponseCue::Affirmative));
/// assert_eq!(detect_response_cue("아니요, 괜찮아요"), Some(ResponseCue::Negative));
/// assert_eq!(detect_response_cue("네 개 주세요"), Some(ResponseCue::Affirmative));
/// assert_eq!(detect_response_cue("네잔 주세요"), None);
/// ```
pub fn detect_response_cue(text: &str) -> Option<ResponseCue> {
    let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|r| r.is_match(text));
    if matches(&NEGATIVE_RE) {
        Some(ResponseCue::Negative)
    } else if matches(&AFFIRMATIVE_RE) {
        Some(ResponseCue::Affirmative)
    } else {
        None
    }
}

/// A group of patterns for one intent
struct PatternGroup {
    name: &'static str,
    intent: Intent,
    weight: f32,
    patterns: Vec<Regex>,
}

/// Option words shared by the option-selection patterns
const OPTION_WORDS: &str = r"아이스|핫|따뜻하게|따뜻한|따듯하게|뜨겁게|뜨거운|차갑게|차가운|시원하게|시원한|라지|레귤러|큰|작은|디카페인|일반\s*원두|휘핑\s*크림|휘핑크림|휘핑|시럽|샷|얼음";

fn rule_table() -> Vec<(&'static str, Intent, f32, Vec<String>)> {
    vec![
        (
            "order",
            Intent::Order,
            classification::ORDER_WEIGHT,
            vec![
                r"(?:\d+|한|두|세|네|다섯)\s*(?:잔|개|컵)(?:\s*(?:이요|요|만|주세요|주문할게요?|주문이요|부탁합니다|부탁드려요|마실게요|먹을게요))?".to_string(),
                r"(?:하나|둘|셋|넷|다섯)\s*(?:주세요|요|이요|주문할게요?)".to_string(),
                r"주문(?:할게요|할게|이요|하려고\s*해요|하고\s*싶어요|할래요|해\s*주세요)?".to_string(),
                r"(?:주세요|줘요|줄래요)".to_string(),
                r"(?:마실게요|먹을게요|먹고\s*싶어요?|마시고\s*싶어요?)".to_string(),
                r"(?:으로|로)\s*(?:할게요|부탁합니다|부탁해요)".to_string(),
            ],
        ),
        (
            "option_selection",
            Intent::OptionSelection,
            classification::OPTION_WEIGHT,
            vec![
                format!(
                    r"(?:{OPTION_WORDS})(?:\s*사이즈)?\s*(?:걸|것|거)?\s*(?:으로|로|은|는)?\s*(?:조금만|많이|적게|추가|빼고|빼|없이|넣어|변경|바꿔)?\s*(?:해\s*주세요|해주세요|주세요|할게요|해요|부탁(?:해요|드려요|합니다)|이요|요|서)?"
                ),
                r"(?i)^\s*(?:l|엘|s|에스|m|엠)(?:\s*사이즈)?(?:으로|로|이요|요)?\s*(?:주세요|해\s*주세요|할게요)?\s*$".to_string(),
                r"(?:으로|로)\s*(?:해\s*주세요|변경|바꿔)".to_string(),
                r"(?:걸로|것으로)\s*(?:주세요|할게요|부탁해요|해\s*주세요)?".to_string(),
                r"(?:사이즈|온도|옵션)\s*(?:변경|바꿔|선택)".to_string(),
            ],
        ),
        (
            "greeting",
            Intent::Greeting,
            classification::GREETING_WEIGHT,
            vec![
                r"안녕(?:하세요|하십니까)?".to_string(),
                r"반갑(?:습니다|네요|구나)|반가워요?|방가방가".to_string(),
                r"(?i)\b(?:hello|hi)\b".to_string(),
                r"어서\s*오(?:세요|십시오)|환영합니다".to_string(),
                r"좋은\s*(?:아침|오후|저녁)(?:이에요|입니다|이네요)?".to_string(),
                r"오랜만(?:이에요|입니다|이네요|에\s*뵙네요)?|오래간만이네요".to_string(),
                r"처음\s*뵙겠습니다".to_string(),
            ],
        ),
        (
            "farewell",
            Intent::Farewell,
            classification::FAREWELL_WEIGHT,
            vec![
                r"안녕히\s*(?:가세요|계세요|가십시오|계십시오)".to_string(),
                r"감사(?:합니다|했습니다)|고맙(?:습니다|습니다요)|고마워요?".to_string(),
                r"잘\s*(?:가요|가세요|있어요|먹었습니다)".to_string(),
                r"다음에\s*(?:또\s*)?(?:올게요|봐요|뵙겠습니다|만나요|방문할게요)".to_string(),
                r"수고(?:하세요|하셨습니다)".to_string(),
                r"(?:좋은|즐거운)\s*하루\s*(?:되세요|보내세요)".to_string(),
                r"(?i)\b(?:bye|goodbye|thanks|thank you)\b".to_string(),
                r"이만\s*(?:가볼게요|실례하겠습니다)".to_string(),
            ],
        ),
        (
            "casual",
            Intent::Casual,
            classification::CASUAL_WEIGHT,
            vec![
                AFFIRMATIVE.to_string(),
                NEGATIVE.to_string(),
                r"날씨|화장실|와이파이|주차|영업|포장|테이크아웃|추천|콘센트|휴무|몇\s*시".to_string(),
            ],
        ),
    ]
}

static RULE_GROUPS: Lazy<Vec<PatternGroup>> = Lazy::new(|| {
    rule_table()
        .into_iter()
        .map(|(name, intent, weight, patterns)| PatternGroup {
            name,
            intent,
            weight,
            patterns: patterns
                .iter()
                .filter_map(|p| match Regex::new(p) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!("Failed to compile {} intent pattern {}: {}", name, p, e);
                        None
                    },
                })
                .collect(),
        })
        .collect()
});

/// Weighted regex intent matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleMatcher;

impl RuleMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Best rule match, or `{casual, 0.0}` when nothing matches
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text = text.trim();
        let total_chars = text.chars().count();
        if total_chars == 0 {
            return ClassificationResult::unknown();
        }

        let mut best: Option<(&PatternGroup, f32)> = None;
        for group in RULE_GROUPS.iter() {
            for pattern in &group.patterns {
                let Some(m) = pattern.find(text) else {
                    continue;
                };
                let matched = m.as_str().trim().chars().count();
                if matched == 0 {
                    continue;
                }
                let coverage = matched as f32 / total_chars as f32;
                let confidence = group.weight * (0.5 + 0.5 * coverage.min(1.0));
                if best.map_or(true, |(_, c)| confidence > c) {
                    best = Some((group, confidence));
                }
            }
        }

        match best {
            Some((group, confidence)) => {
                tracing::trace!(group = group.name, confidence, "Rule match");
                ClassificationResult::rule(group.intent, confidence)
            },
            None => ClassificationResult::unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_agent_core::ClassificationSource;

    fn classify(text: &str) -> ClassificationResult {
        RuleMatcher::new().classify(text)
    }

    #[test]
    fn test_full_greeting() {
        let result = classify("안녕하세요");
        assert_eq!(result.intent, Intent::Greeting);
        assert!((result.confidence - 0.95).abs() < 1e-6);
        assert_eq!(result.source, ClassificationSource::Rule);
    }

    #[test]
    fn test_farewell_beats_greeting_prefix() {
        assert_eq!(classify("안녕히 가세요").intent, Intent::Farewell);
        assert_eq!(classify("감사합니다").intent, Intent::Farewell);
    }

    #[test]
    fn test_order_confidence_formula() {
        // "주세요" covers 3 of 8 characters
        let result = classify("카페라떼 주세요");
        assert_eq!(result.intent, Intent::Order);
        let expected = 0.9 * (0.5 + 0.5 * 3.0 / 8.0);
        assert!((result.confidence - expected).abs() < 1e-5);
    }

    #[test]
    fn test_option_answers() {
        for text in ["아이스로 주세요", "라지 사이즈로 해주세요", "따뜻한 걸로", "L", "디카페인으로 변경할게요"] {
            let result = classify(text);
            assert_eq!(result.intent, Intent::OptionSelection, "{}", text);
            assert!(result.confidence > 0.8, "{}: {}", text, result.confidence);
        }
    }

    #[test]
    fn test_yes_no_are_casual() {
        assert_eq!(classify("네").intent, Intent::Casual);
        assert_eq!(classify("아니요").intent, Intent::Casual);
        assert!((classify("네").confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_counted_order_beats_yes() {
        assert_eq!(classify("네 개 주세요").intent, Intent::Order);
    }

    #[test]
    fn test_no_match_is_unknown() {
        let result = classify("음...");
        assert_eq!(result.intent, Intent::Casual);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(classify("   ").confidence, 0.0);
    }

    #[test]
    fn test_response_cues() {
        assert_eq!(detect_response_cue("응 좋아"), Some(ResponseCue::Affirmative));
        assert_eq!(detect_response_cue("없어요"), Some(ResponseCue::Negative));
        assert_eq!(detect_response_cue("아니 괜찮아요"), Some(ResponseCue::Negative));
        assert_eq!(detect_response_cue("아메리카노 주세요"), None);
        // 아이스 starts with 아 but is not a negative answer
        assert_eq!(detect_response_cue("아이스요"), None);
    }
}
