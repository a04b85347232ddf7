//! Conversation turns and the per-session dialogue record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clarification::ClarificationQueue;
use crate::order::OrderState;

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One utterance in the session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// Everything the engine knows about one customer conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub order: OrderState,
    pub clarifications: ClarificationQueue,
    history: Vec<ConversationTurn>,
}

impl DialogueSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_updated_at: now,
            order: OrderState::new(),
            clarifications: ClarificationQueue::new(),
            history: Vec::new(),
        }
    }

    /// History is append-only
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Last `n` turns, oldest first
    pub fn recent_history(&self, n: usize) -> &[ConversationTurn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn record(&mut self, turn: ConversationTurn) {
        self.history.push(turn);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    pub fn turn_count(&self) -> usize {
        self.history
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_append_only() {
        let mut session = DialogueSession::new("s1");
        session.record(ConversationTurn::user("아메리카노 주세요"));
        session.record(ConversationTurn::assistant("따뜻한 음료로 드릴까요?"));
        session.record(ConversationTurn::user("아이스요"));

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.turn_count(), 2);
        assert_eq!(session.recent_history(2)[0].role, TurnRole::Assistant);
        assert_eq!(session.recent_history(10).len(), 3);
    }

    #[test]
    fn test_record_touches_session() {
        let mut session = DialogueSession::new("s1");
        let created = session.last_updated_at;
        session.record(ConversationTurn::user("안녕하세요"));
        assert!(session.last_updated_at >= created);
    }
}
