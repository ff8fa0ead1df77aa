use crate::models::ConversationTurn;
use std::collections::VecDeque;

/// Ten user/assistant exchanges.
pub const DEFAULT_HISTORY_TURNS: usize = 20;

/// Fixed-capacity conversation buffer. Appending past capacity evicts the
/// oldest turns first, so `len() <= capacity()` holds after every push.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_TURNS)
    }
}

impl ConversationHistory {
    /// Odd capacities are rounded up so eviction keeps whole exchanges.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let capacity = capacity + capacity % 2;
        Self {
            turns: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Appends a user turn and its reply as one exchange.
    pub fn push_exchange(&mut self, user: ConversationTurn, reply: ConversationTurn) {
        self.push(user);
        self.push(reply);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = ConversationHistory::with_capacity(4);
        for i in 0..3 {
            history.push_exchange(
                ConversationTurn::user(format!("q{}", i)),
                ConversationTurn::assistant(format!("a{}", i)),
            );
        }

        assert_eq!(history.len(), 4);
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(history.iter().next().map(|t| t.role), Some(Role::User));
    }

    #[test]
    fn test_default_capacity_holds_ten_exchanges() {
        let mut history = ConversationHistory::default();
        for i in 0..11 {
            history.push_exchange(
                ConversationTurn::user(format!("q{}", i)),
                ConversationTurn::assistant(format!("a{}", i)),
            );
            assert!(history.len() <= DEFAULT_HISTORY_TURNS);
        }

        assert_eq!(history.len(), 20);
        assert_eq!(history.iter().next().unwrap().content, "q1");
    }

    #[test]
    fn test_single_entry_counts_as_one_slot() {
        let mut history = ConversationHistory::with_capacity(4);
        history.push_exchange(ConversationTurn::user("q"), ConversationTurn::assistant("a"));
        history.push(ConversationTurn::assistant("Error: tool failed"));
        history.push(ConversationTurn::user("next"));
        assert_eq!(history.len(), 4);

        history.push(ConversationTurn::assistant("reply"));
        assert_eq!(history.len(), 4);
        assert_eq!(history.iter().next().unwrap().content, "a");
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut history = ConversationHistory::with_capacity(0);
        history.push(ConversationTurn::user("only"));
        assert_eq!(history.capacity(), 2);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_odd_capacity_keeps_exchanges_whole() {
        let mut history = ConversationHistory::with_capacity(5);
        assert_eq!(history.capacity(), 6);

        for i in 0..4 {
            history.push_exchange(
                ConversationTurn::user(format!("q{}", i)),
                ConversationTurn::assistant(format!("a{}", i)),
            );
        }

        assert_eq!(history.len(), 6);
        let head = history.iter().next().unwrap();
        assert_eq!(head.role, Role::User);
        assert_eq!(head.content, "q1");
    }
}
