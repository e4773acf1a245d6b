//! DocSage Memory — conversation history in two tiers.
//!
//! Each conversation has a bounded in-process recent window and a capped
//! durable log persisted as one JSON file for all conversations.

pub mod memory;
pub mod types;

pub use memory::ConversationMemory;
pub use types::{Message, Role};
