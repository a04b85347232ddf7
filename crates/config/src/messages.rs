//! User-facing dialogue messages
//!
//! All kiosk utterances produced locally live here so a deployment can
//! reword them from config without touching the engine.

use kiosk_agent_core::categories;
use serde::{Deserialize, Serialize};

/// Messages spoken by the kiosk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueMessages {
    pub greeting: String,
    pub farewell: String,
    pub casual: String,
    pub item_added: String,
    pub option_applied: String,
    /// Generic "anything else?" prompt kept at the head of the queue
    pub continuation_prompt: String,
    /// Substrings that identify a continuation prompt proposed elsewhere
    pub continuation_markers: Vec<String>,
    pub ask_next_item: String,
    pub order_complete: String,
    pub fallback_error: String,
    pub clarifications: ClarificationTemplates,
}

impl Default for DialogueMessages {
    fn default() -> Self {
        Self {
            greeting: "안녕하세요! 무엇을 도와드릴까요?".to_string(),
            farewell: "이용해 주셔서 감사합니다. 좋은 하루 되세요!".to_string(),
            casual: "네, 말씀해 주세요. 주문을 도와드릴게요.".to_string(),
            item_added: "주문이 추가되었습니다. 더 주문하실 것이 있으신가요?".to_string(),
            option_applied: "옵션이 선택되었습니다. 더 주문하실 것이 있으신가요?".to_string(),
            continuation_prompt: "더 주문하실 것이 있으신가요?".to_string(),
            continuation_markers: vec!["더 주문".to_string(), "추가 주문".to_string()],
            ask_next_item: "어떤 메뉴를 더 주문하시겠어요?".to_string(),
            order_complete: "주문이 완료되었습니다. 감사합니다!".to_string(),
            fallback_error: "주문 분석 중 오류가 발생했습니다. 다시 시도해주세요.".to_string(),
            clarifications: ClarificationTemplates::default(),
        }
    }
}

impl DialogueMessages {
    /// Whether a queued question is the generic continuation prompt
    pub fn is_continuation_prompt(&self, text: &str) -> bool {
        text.trim() == self.continuation_prompt.trim()
            || self
                .continuation_markers
                .iter()
                .any(|marker| text.contains(marker.as_str()))
    }
}

/// Clarification question templates.
///
/// `{menu}` is replaced by the item name followed by the matching object
/// particle (을/를); `{category}` by the category name. When the same item
/// is on the order more than once, later lines are named through
/// `repeated_menu` (`{ordinal}` is a Korean ordinal word, `{menu}` the name)
/// so each line gets its own question text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarificationTemplates {
    pub temperature: String,
    pub size: String,
    pub other: String,
    pub repeated_menu: String,
}

impl Default for ClarificationTemplates {
    fn default() -> Self {
        Self {
            temperature: "{menu} 따뜻한 음료로 드릴까요, 차가운 음료로 드릴까요?".to_string(),
            size: "{menu} 레귤러 사이즈로 드릴까요, 라지 사이즈로 드릴까요?".to_string(),
            other: "{menu} 어떤 {category} 옵션으로 드릴까요?".to_string(),
            repeated_menu: "{ordinal} 번째 {menu}".to_string(),
        }
    }
}

impl ClarificationTemplates {
    /// Question asking for `category` of `menu_name`
    pub fn render(&self, menu_name: &str, category: &str) -> String {
        self.render_line(menu_name, 1, category)
    }

    /// Question for the `ordinal`-th order line of `menu_name` (1-based).
    /// The first line reads exactly like [`render`](Self::render).
    pub fn render_line(&self, menu_name: &str, ordinal: usize, category: &str) -> String {
        let menu = if ordinal <= 1 {
            menu_name.to_string()
        } else {
            self.repeated_menu
                .replace("{ordinal}", &ordinal_word(ordinal))
                .replace("{menu}", menu_name)
        };
        let template = match category {
            categories::TEMPERATURE => &self.temperature,
            categories::SIZE => &self.size,
            _ => &self.other,
        };
        template
            .replace("{menu}", &with_object_particle(&menu))
            .replace("{category}", category)
    }

    /// Category a rendered question asks about, judged by its wording
    pub fn category_of(&self, question: &str) -> Option<&'static str> {
        const TEMPERATURE_CUES: [&str; 5] = ["온도", "따뜻", "차가", "아이스", "핫"];
        const SIZE_CUES: [&str; 4] = ["크기", "사이즈", "레귤러", "라지"];

        // Size first: item names such as "아이스티" carry temperature cues.
        if SIZE_CUES.iter().any(|cue| question.contains(cue)) {
            Some(categories::SIZE)
        } else if TEMPERATURE_CUES.iter().any(|cue| question.contains(cue)) {
            Some(categories::TEMPERATURE)
        } else {
            None
        }
    }
}

/// Native Korean ordinal stem: 두, 세, ... 열, then digits
fn ordinal_word(ordinal: usize) -> String {
    const WORDS: [&str; 9] = ["두", "세", "네", "다섯", "여섯", "일곱", "여덟", "아홉", "열"];
    match ordinal.checked_sub(2).and_then(|i| WORDS.get(i)) {
        Some(word) => word.to_string(),
        None => ordinal.to_string(),
    }
}

/// Append 을 after a final consonant and 를 after a vowel.
/// Non-Hangul endings get 을.
fn with_object_particle(word: &str) -> String {
    let particle = match word.trim_end().chars().last() {
        Some(c @ '가'..='힣') => {
            let jongseong = (c as u32 - '가' as u32) % 28;
            if jongseong == 0 {
                "를"
            } else {
                "을"
            }
        },
        _ => "을",
    };
    format!("{}{}", word.trim_end(), particle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_particle() {
        assert_eq!(with_object_particle("아메리카노"), "아메리카노를");
        assert_eq!(with_object_particle("캐모마일"), "캐모마일을");
        assert_eq!(with_object_particle("그린티 라떼"), "그린티 라떼를");
    }

    #[test]
    fn test_render_clarification() {
        let templates = ClarificationTemplates::default();
        assert_eq!(
            templates.render("아메리카노", "온도"),
            "아메리카노를 따뜻한 음료로 드릴까요, 차가운 음료로 드릴까요?"
        );
        assert_eq!(
            templates.render("캐모마일", "크기"),
            "캐모마일을 레귤러 사이즈로 드릴까요, 라지 사이즈로 드릴까요?"
        );
    }

    #[test]
    fn test_repeated_line_gets_its_own_question() {
        let templates = ClarificationTemplates::default();
        assert_eq!(
            templates.render_line("아메리카노", 1, "온도"),
            templates.render("아메리카노", "온도")
        );
        assert_eq!(
            templates.render_line("아메리카노", 2, "온도"),
            "두 번째 아메리카노를 따뜻한 음료로 드릴까요, 차가운 음료로 드릴까요?"
        );
        assert_eq!(
            templates.render_line("치즈케이크", 12, "크기"),
            "12 번째 치즈케이크를 레귤러 사이즈로 드릴까요, 라지 사이즈로 드릴까요?"
        );
        let third = templates.render_line("카페라떼", 3, "크기");
        assert!(third.starts_with("세 번째 카페라떼를"));
        assert_eq!(templates.category_of(&third), Some("크기"));
    }

    #[test]
    fn test_category_of_question() {
        let templates = ClarificationTemplates::default();
        let temperature = templates.render("카페라떼", "온도");
        let size = templates.render("카페라떼", "크기");
        assert_eq!(templates.category_of(&temperature), Some("온도"));
        assert_eq!(templates.category_of(&size), Some("크기"));
        assert_eq!(templates.category_of("더 주문하실 것이 있으신가요?"), None);
    }

    #[test]
    fn test_continuation_prompt_detection() {
        let messages = DialogueMessages::default();
        assert!(messages.is_continuation_prompt("더 주문하실 것이 있으신가요?"));
        assert!(messages.is_continuation_prompt("추가 주문 있으세요?"));
        assert!(!messages.is_continuation_prompt(
            &messages.clarifications.render("아메리카노", "온도")
        ));
    }
}
