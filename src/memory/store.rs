//! Conversation transcript storage
//!
//! Append-only log of system/user/assistant turns with one exception: the
//! most recent assistant turn may be overwritten when a function result
//! produces a better narration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single turn; serializes to the `{role, content}` chat message shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// What `replace_last_assistant` did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnUpdate {
    /// Overwrote the assistant turn at this index.
    Replaced(usize),
    /// No assistant turn existed; appended at this index.
    Appended(usize),
}

/// Transcript owned by exactly one advisor session.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    system_prompt: String,
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    /// Start a transcript seeded with the system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let now = Utc::now();

        Self {
            session_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            turns: vec![ConversationTurn::system(system_prompt.clone())],
            system_prompt,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ConversationTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ConversationTurn::assistant(content));
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(ConversationTurn::system(content));
    }

    /// Index of the most recent assistant turn, searching from the end.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.turns
            .iter()
            .rposition(|turn| turn.role == MessageRole::Assistant)
    }

    /// Overwrite the most recent assistant turn, or append one if none exists.
    pub fn replace_last_assistant(&mut self, content: impl Into<String>) -> TurnUpdate {
        let content = content.into();
        self.updated_at = Utc::now();

        match self.last_assistant_index() {
            Some(index) => {
                self.turns[index].content = content;
                TurnUpdate::Replaced(index)
            }
            None => {
                self.turns.push(ConversationTurn::assistant(content));
                TurnUpdate::Appended(self.turns.len() - 1)
            }
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Drop turns after the first `len`; the system prompt always stays.
    pub fn truncate(&mut self, len: usize) {
        if len < self.turns.len() {
            self.turns.truncate(len.max(1));
            self.updated_at = Utc::now();
        }
    }

    /// Drop everything except the system prompt.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.turns
            .push(ConversationTurn::system(self.system_prompt.clone()));
        self.updated_at = Utc::now();
    }
}
