use crate::config::RetentionPolicy;
use crate::models::ConversationTurn;

/// Ordered conversation history for one session.
///
/// Turns are only ever appended in user/assistant pairs. A sliding window
/// drops the oldest pairs once the window is exceeded; `reset` clears all.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    retention: RetentionPolicy,
}

impl ConversationMemory {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            turns: Vec::new(),
            retention,
        }
    }

    /// Record one completed exchange.
    pub fn append_exchange(&mut self, user: &str, assistant: &str) {
        self.turns.push(ConversationTurn::user(user));
        self.turns.push(ConversationTurn::assistant(assistant));

        if let RetentionPolicy::SlidingWindow { max_turns } = self.retention {
            while self.turns.len() > max_turns && self.turns.len() >= 2 {
                self.turns.drain(..2);
            }
        }
    }

    /// Snapshot of the history, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn exchanges_append_in_pairs() {
        let mut memory = ConversationMemory::default();
        for i in 0..5 {
            memory.append_exchange(&format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(memory.len(), 10);
        let roles: Vec<Role> = memory.turns().iter().map(|t| t.role).collect();
        for pair in roles.chunks(2) {
            assert_eq!(pair, [Role::User, Role::Assistant]);
        }
        assert_eq!(memory.turns()[0].content, "q0");
        assert_eq!(memory.turns()[9].content, "a4");
    }

    #[test]
    fn unbounded_by_default() {
        let memory = ConversationMemory::default();
        assert_eq!(memory.retention(), RetentionPolicy::Unbounded);
        assert!(memory.is_empty());
    }

    #[test]
    fn sliding_window_drops_oldest_pairs() {
        let mut memory = ConversationMemory::new(RetentionPolicy::SlidingWindow { max_turns: 4 });
        for i in 0..4 {
            memory.append_exchange(&format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.turns()[0].content, "q2");
        assert_eq!(memory.turns()[3].content, "a3");
    }

    #[test]
    fn odd_window_keeps_whole_pairs() {
        let mut memory = ConversationMemory::new(RetentionPolicy::SlidingWindow { max_turns: 3 });
        memory.append_exchange("q0", "a0");
        memory.append_exchange("q1", "a1");
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].role, Role::User);
    }

    #[test]
    fn zero_window_keeps_nothing() {
        let mut memory = ConversationMemory::new(RetentionPolicy::SlidingWindow { max_turns: 0 });
        memory.append_exchange("q", "a");
        assert!(memory.is_empty());
    }

    #[test]
    fn reset_clears_history() {
        let mut memory = ConversationMemory::default();
        memory.append_exchange("q", "a");
        memory.reset();
        assert!(memory.is_empty());
    }
}
