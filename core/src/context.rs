use std::collections::VecDeque;
use serde::Serialize;
use crate::error::{RecallError, Result};
use crate::message::{Message, MessageRole};
use crate::DEFAULT_WINDOW_CAPACITY;

/// Bounded short-term transcript passed verbatim to the backend each turn.
///
/// Entries strictly alternate user/assistant starting with a user message.
/// Overflow evicts whole pairs from the front, so after a turn is committed
/// the window only ever holds complete pairs.
#[derive(Debug, Clone, Serialize)]
pub struct ContextWindow {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            messages: VecDeque::with_capacity(DEFAULT_WINDOW_CAPACITY + 1),
            capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl ContextWindow {
    /// `capacity` counts messages and must hold at least one full pair.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || capacity % 2 != 0 {
            return Err(RecallError::InvalidConfig(format!(
                "context window capacity must be a positive even number, got {}",
                capacity
            )));
        }
        Ok(Self {
            messages: VecDeque::with_capacity(capacity + 1),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of complete user/assistant pairs held.
    pub fn pairs(&self) -> usize {
        self.messages.len() / 2
    }

    /// True when every user message has its answer.
    pub fn is_balanced(&self) -> bool {
        self.messages.len() % 2 == 0
    }

    fn expected_role(&self) -> MessageRole {
        if self.messages.len() % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        }
    }

    /// Appends a message and evicts the oldest pairs that no longer fit.
    /// Returns how many pairs were evicted.
    pub fn append(&mut self, message: Message) -> Result<usize> {
        let expected = self.expected_role();
        if message.role() != expected {
            return Err(RecallError::WindowOrder {
                expected,
                found: message.role(),
            });
        }
        self.messages.push_back(message);
        Ok(self.evict_oldest_pair_if_over_capacity())
    }

    pub fn evict_oldest_pair_if_over_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
            self.messages.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Records a finished turn. Returns how many old pairs were evicted.
    pub fn commit_turn(&mut self, user: Message, assistant: Message) -> Result<usize> {
        if !self.is_balanced() {
            return Err(RecallError::UnansweredMessage);
        }
        let mut evicted = self.append(user)?;
        evicted += self.append(assistant)?;
        Ok(evicted)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled(pairs: usize) -> ContextWindow {
        let mut window = ContextWindow::default();
        for i in 0..pairs {
            window
                .commit_turn(Message::user(format!("q{i}")), Message::assistant(format!("a{i}")))
                .unwrap();
        }
        window
    }

    #[test]
    fn test_rejects_odd_or_zero_capacity() {
        assert!(ContextWindow::new(0).is_err());
        assert!(ContextWindow::new(7).is_err());
        assert_eq!(ContextWindow::new(4).unwrap().capacity(), 4);
    }

    #[test]
    fn test_eleventh_message_evicts_exactly_the_oldest_pair() {
        let mut window = filled(5);
        assert_eq!(window.len(), 10);

        let evicted = window.append(Message::user("q5")).unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(window.len(), 9);

        let contents: Vec<&str> = window.messages().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2", "q3", "a3", "q4", "a4", "q5"]);
    }

    #[test]
    fn test_never_exceeds_capacity_and_keeps_pairs() {
        let mut window = ContextWindow::default();
        for i in 0..37 {
            window
                .commit_turn(Message::user(format!("q{i}")), Message::assistant(format!("a{i}")))
                .unwrap();
            assert!(window.len() <= window.capacity());
            assert_eq!(window.len() % 2, 0);
            for (idx, msg) in window.messages().enumerate() {
                let expected = if idx % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
                assert_eq!(msg.role(), expected);
            }
        }
        assert_eq!(window.messages().next().unwrap().content(), "q32");
    }

    #[test]
    fn test_rejects_out_of_order_append() {
        let mut window = ContextWindow::default();
        let err = window.append(Message::assistant("orphan")).unwrap_err();
        assert!(matches!(
            err,
            RecallError::WindowOrder { expected: MessageRole::User, found: MessageRole::Assistant }
        ));
        assert!(window.is_empty());
    }

    #[test]
    fn test_commit_turn_refuses_dangling_user() {
        let mut window = ContextWindow::default();
        window.append(Message::user("pending")).unwrap();
        assert!(!window.is_balanced());

        let err = window.commit_turn(Message::user("q"), Message::assistant("a")).unwrap_err();
        assert!(matches!(err, RecallError::UnansweredMessage));
        assert_eq!(err.to_string(), "Context window ends with an unanswered user message");
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_to_vec_preserves_order() {
        let window = filled(2);
        assert_eq!(
            window.to_vec(),
            vec![
                Message::user("q0"),
                Message::assistant("a0"),
                Message::user("q1"),
                Message::assistant("a1"),
            ]
        );
        assert_eq!(window.pairs(), 2);
    }
}
