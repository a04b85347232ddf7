//! Prompt Building
//!
//! Builds the order-analysis conversation sent to the fallback model: a
//! Korean system prompt with the menu and the expected JSON shape, followed
//! by user messages carrying the history, pending clarifications, the
//! current order and the utterance itself.

use std::fmt;

use kiosk_agent_core::{FallbackContext, MenuCatalog, OptionGroup};
use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

const INSTRUCTIONS: &str = r#"주문 분석 시 다음 사항을 고려하라:
1. 메뉴 이름과 수량
2. 필수 옵션 (온도, 크기)
3. 선택 옵션 (커피는 디카페인 여부, 티는 휘핑크림 추가 여부)
4. 특별 요청사항

응답은 다음 JSON 형식으로만 제공하라:
{
    "is_order_related": true or false,
    "greeting_response": "주문과 관련 없는 대화인 경우 여기에 응답을 제공하라",
    "items": [
        {
            "name": "메뉴명",
            "quantity": 수량,
            "options": ["옵션1", "옵션2"]
        }
    ],
    "total_price": 총 가격,
    "special_requests": "특별 요청사항",
    "clarification_items": ["명확하지 않은 항목1"]
}

사용자의 입력이 주문과 관련이 없는 경우(예: 인사, 날씨 질문, 대화 나누기 등):
1. "is_order_related"를 false로 설정하라.
2. "greeting_response"에 적절한 대화 응답을 제공하라.
3. 기존 주문 상태는 변경하지 마라.

주문과 관련된 경우 "items"에는 기존 주문을 포함한 전체 주문을 담아라.
메뉴명과 옵션명은 메뉴 정보에 있는 이름을 그대로 사용하라.

필수 옵션이 누락된 경우 다음 형식으로 질문하라:
- 온도: "<메뉴명>을 따뜻한 음료로 드릴까요, 차가운 음료로 드릴까요?"
- 크기: "<메뉴명>을 레귤러 사이즈로 드릴까요, 라지 사이즈로 드릴까요?"
clarification_items에는 한 번에 하나의 질문만 포함하라.
가격을 직접 묻지 마라. 이미 응답된 항목에 대해서는 다시 물어보지 마라."#;

/// Builds fallback prompts from a session snapshot
pub struct FallbackPromptBuilder<'a> {
    catalog: &'a dyn MenuCatalog,
}

impl<'a> FallbackPromptBuilder<'a> {
    pub fn new(catalog: &'a dyn MenuCatalog) -> Self {
        Self { catalog }
    }

    /// Menu grouped by category, with option price adjustments
    pub fn menu_section(&self) -> String {
        let mut out = String::from("메뉴 정보:\n");
        let mut categories: Vec<String> = Vec::new();
        let entries = self.catalog.all_items();
        for entry in &entries {
            if !categories.contains(&entry.category) {
                categories.push(entry.category.clone());
            }
        }

        for category in &categories {
            out.push_str(&format!("\n## {}\n", category));
            for entry in entries.iter().filter(|e| &e.category == category) {
                out.push_str(&format!("- {}: {}원\n", entry.name, entry.base_price));
                let Ok(schema) = self.catalog.options_schema(&entry.name) else {
                    continue;
                };
                append_groups(&mut out, "필수 옵션", &schema.required);
                append_groups(&mut out, "선택 옵션", &schema.optional);
            }
        }
        out
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "당신은 카페 주문을 돕는 AI 어시스턴트이다.\n\
             사용자의 음성 주문을 분석하고, 주문을 정확하게 처리하기 위해 필요한 정보를 수집해야 한다.\n\n\
             아래 정보를 참고하라:\n{}\n{}",
            self.menu_section(),
            INSTRUCTIONS
        )
    }

    /// Full message list for one escalated turn
    pub fn build(&self, context: &FallbackContext) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt())];

        if !context.history.is_empty() {
            let mut summary = String::from("이전 대화:\n");
            for turn in &context.history {
                summary.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.content));
            }
            messages.push(Message::user(format!("대화 기록: {}", summary)));
        }

        if !context.pending_clarifications.is_empty() {
            let mut summary = String::from("아직 명확하지 않은 항목들:\n");
            for item in &context.pending_clarifications {
                summary.push_str(&format!("- {}\n", item));
            }
            messages.push(Message::user(format!("명확화 필요 항목: {}", summary)));
        }

        if !context.current_order.is_empty() {
            let mut summary = String::from("현재 주문 상태:\n");
            for item in &context.current_order.items {
                let missing = if item.missing_required_options.is_empty() {
                    String::new()
                } else {
                    format!(
                        " (누락된 필수 옵션: {})",
                        item.missing_required_options.join(", ")
                    )
                };
                summary.push_str(&format!(
                    "- {} x {} (옵션: {}){}\n",
                    item.name,
                    item.quantity,
                    item.options.join(", "),
                    missing
                ));
            }
            messages.push(Message::user(format!("현재 주문: {}", summary)));
        }

        messages.push(Message::user(format!(
            "현재 사용자 입력: {}",
            context.utterance
        )));
        messages
    }
}

fn append_groups(out: &mut String, label: &str, groups: &[OptionGroup]) {
    if groups.is_empty() {
        return;
    }
    out.push_str(&format!("  {}:\n", label));
    for group in groups {
        let options: Vec<String> = group
            .options
            .iter()
            .map(|opt| match opt.price_adjustment {
                0 => opt.name.clone(),
                p if p > 0 => format!("{}(+{}원)", opt.name, p),
                p => format!("{}({}원)", opt.name, p),
            })
            .collect();
        out.push_str(&format!("    {}: {}\n", group.category, options.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_agent_config::StaticMenuCatalog;
    use kiosk_agent_core::{
        ConversationTurn, EscalationReason, OrderItem, OrderState,
    };

    fn context(catalog: &StaticMenuCatalog) -> FallbackContext {
        let schema = catalog.options_schema("아메리카노").unwrap();
        let mut order = OrderState::new();
        order.add_item(OrderItem::new("아메리카노", 1, vec![], &schema));
        FallbackContext {
            session_id: "s1".to_string(),
            utterance: "음 그거 말고 다른 거".to_string(),
            reason: EscalationReason::ExtractionMiss,
            current_order: order,
            pending_clarifications: vec![
                "아메리카노를 따뜻한 음료로 드릴까요, 차가운 음료로 드릴까요?".to_string(),
            ],
            history: vec![
                ConversationTurn::user("아메리카노 주세요"),
                ConversationTurn::assistant("아메리카노를 따뜻한 음료로 드릴까요, 차가운 음료로 드릴까요?"),
            ],
            menu: catalog.all_items(),
        }
    }

    #[test]
    fn test_menu_section_lists_option_prices() {
        let catalog = StaticMenuCatalog::cafe_default();
        let menu = FallbackPromptBuilder::new(&catalog).menu_section();
        assert!(menu.contains("## 커피"));
        assert!(menu.contains("- 아메리카노: 4500원"));
        assert!(menu.contains("아이스(+500원)"));
        assert!(menu.contains("선택 옵션"));
        assert!(menu.contains("- 티라미수: 6500원"));
    }

    #[test]
    fn test_build_includes_session_context() {
        let catalog = StaticMenuCatalog::cafe_default();
        let messages = FallbackPromptBuilder::new(&catalog).build(&context(&catalog));

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("is_order_related"));
        assert!(messages[1].content.contains("user: 아메리카노 주세요"));
        assert!(messages[2].content.contains("명확화 필요 항목"));
        assert!(messages[3].content.contains("누락된 필수 옵션: 온도, 크기"));
        assert_eq!(messages[4].content, "현재 사용자 입력: 음 그거 말고 다른 거");
    }

    #[test]
    fn test_empty_session_sends_only_utterance() {
        let catalog = StaticMenuCatalog::cafe_default();
        let mut ctx = context(&catalog);
        ctx.history.clear();
        ctx.pending_clarifications.clear();
        ctx.current_order = OrderState::new();

        let messages = FallbackPromptBuilder::new(&catalog).build(&ctx);
        assert_eq!(messages.len(), 2);
    }
}
