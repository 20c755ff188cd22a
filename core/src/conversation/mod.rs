//! Conversation state owned by the orchestrator for one query

pub mod state;
pub mod turn;

pub use state::ConversationState;
pub use turn::{Role, Turn};
