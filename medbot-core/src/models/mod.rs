pub mod conversation;
pub mod record;

pub use conversation::{Conversation, Role, Turn};
pub use record::{EntityKind, Record};
