//! Messages and the in-memory conversation store.

pub mod message;
pub mod store;

pub use message::{Message, Role, Transcript};
pub use store::ConversationStore;
