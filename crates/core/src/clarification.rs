//! Clarification queue
//!
//! Pending questions are answered strictly in FIFO order. Answered questions
//! are remembered case-insensitively and can never be queued again, which
//! keeps duplicate questions proposed by the fallback from looping.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClarificationQueue {
    pending: VecDeque<String>,
    resolved: HashSet<String>,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl ClarificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current question, if any
    pub fn head(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn is_resolved(&self, text: &str) -> bool {
        self.resolved.contains(&normalize(text))
    }

    pub fn is_pending(&self, text: &str) -> bool {
        let key = normalize(text);
        self.pending.iter().any(|p| normalize(p) == key)
    }

    /// Queue a question unless it is blank, already pending or already resolved.
    /// Returns whether it was added.
    pub fn enqueue(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() || self.is_resolved(&text) || self.is_pending(&text) {
            return false;
        }
        self.pending.push_back(text);
        true
    }

    /// Pop the head and remember it as answered
    pub fn resolve_head(&mut self) -> Option<String> {
        let head = self.pending.pop_front()?;
        self.resolved.insert(normalize(&head));
        Some(head)
    }

    /// Pop the head without remembering it.
    ///
    /// Used for the generic "anything else?" prompt, which is asked again
    /// after every completed item.
    pub fn dismiss_head(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Remove a specific pending question and mark it answered
    pub fn resolve(&mut self, text: &str) -> bool {
        let key = normalize(text);
        let before = self.pending.len();
        self.pending.retain(|p| normalize(p) != key);
        let removed = self.pending.len() != before;
        if removed {
            self.resolved.insert(key);
        }
        removed
    }

    /// Remove a specific pending question without marking it answered
    pub fn discard(&mut self, text: &str) -> bool {
        let key = normalize(text);
        let before = self.pending.len();
        self.pending.retain(|p| normalize(p) != key);
        self.pending.len() != before
    }

    /// Drop every pending question (answered set is kept)
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = ClarificationQueue::new();
        queue.enqueue("온도 질문");
        queue.enqueue("크기 질문");
        assert_eq!(queue.head(), Some("온도 질문"));
        assert_eq!(queue.resolve_head().as_deref(), Some("온도 질문"));
        assert_eq!(queue.head(), Some("크기 질문"));
    }

    #[test]
    fn test_resolved_never_requeued() {
        let mut queue = ClarificationQueue::new();
        assert!(queue.enqueue("Hot or Iced?"));
        queue.resolve_head();

        assert!(!queue.enqueue("Hot or Iced?"));
        assert!(!queue.enqueue("hot or iced?"));
        assert!(!queue.enqueue("  HOT OR ICED?  "));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicate_pending_ignored() {
        let mut queue = ClarificationQueue::new();
        assert!(queue.enqueue("크기 질문"));
        assert!(!queue.enqueue("크기 질문"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_dismissed_prompt_can_return() {
        let mut queue = ClarificationQueue::new();
        queue.enqueue("더 주문하실 것이 있으신가요?");
        queue.dismiss_head();
        assert!(queue.enqueue("더 주문하실 것이 있으신가요?"));
    }

    #[test]
    fn test_resolve_specific() {
        let mut queue = ClarificationQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");
        assert!(queue.resolve("B"));
        assert_eq!(queue.pending().collect::<Vec<_>>(), vec!["a"]);
        assert!(queue.is_resolved("b"));
        assert!(!queue.resolve("missing"));
    }

    #[test]
    fn test_discard_does_not_resolve() {
        let mut queue = ClarificationQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");
        assert!(queue.discard("b"));
        assert!(!queue.is_resolved("b"));
        assert!(queue.enqueue("b"));
    }
}
