//! Conversation memory
//!
//! Holds the ordered transcript a single advisor session sends to the
//! language model. Process-local; nothing is persisted.

pub mod store;

pub use store::{Conversation, ConversationTurn, MessageRole, TurnUpdate};
