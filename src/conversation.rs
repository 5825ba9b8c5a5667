//! Append-only conversation transcript
//!
//! The store is the single source of truth for both display and the
//! prompt context sent to the answer adapter: what the user sees is
//! exactly the history the model sees.

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    System,
    User,
    Assistant,
}

/// One message in the conversation, immutable once appended
///
/// Serializes to the `{role, content}` shape the chat completions API
/// expects, so the snapshot can be sent as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Speaker,
    pub content: String,
}

impl Turn {
    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::System,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only log of conversation turns
///
/// Insertion order is significant. No deletion or in-place mutation is
/// exposed; invariant: at most one system turn, and only in the leading
/// position.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a leading system turn
    #[must_use]
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(prompt)],
        }
    }

    /// Append a turn. O(1), never fails.
    pub fn append(&mut self, turn: Turn) {
        debug_assert!(
            turn.role != Speaker::System || self.turns.is_empty(),
            "system turn must lead the conversation"
        );
        self.turns.push(turn);
    }

    /// Immutable view of the full history, in insertion order
    #[must_use]
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recently appended turn, if any
    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True when the last turn is a user turn awaiting its answer
    #[must_use]
    pub fn needs_answer(&self) -> bool {
        matches!(
            self.last_turn(),
            Some(Turn {
                role: Speaker::User,
                ..
            })
        )
    }

    /// Number of turns in the store
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when the store holds no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut store = ConversationStore::with_system_prompt("be helpful");
        store.append(Turn::user("hello"));
        store.append(Turn::assistant("hi there"));

        let turns = store.snapshot();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Speaker::System);
        assert_eq!(turns[1].content, "hello");
        assert_eq!(turns[2].role, Speaker::Assistant);
    }

    #[test]
    fn needs_answer_tracks_last_role() {
        let mut store = ConversationStore::new();
        assert!(!store.needs_answer());

        store.append(Turn::user("how do I treat tomato blight?"));
        assert!(store.needs_answer());

        store.append(Turn::assistant("remove affected leaves first"));
        assert!(!store.needs_answer());
    }

    #[test]
    fn snapshot_is_stable_across_appends() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("first"));
        let before = store.snapshot().to_vec();

        store.append(Turn::assistant("second"));
        assert_eq!(&store.snapshot()[..1], &before[..]);
    }

    #[test]
    fn speaker_serializes_lowercase() {
        let turn = Turn::user("hi");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hi");

        let sys = serde_json::to_value(Turn::system("x")).unwrap();
        assert_eq!(sys["role"], "system");
    }
}
