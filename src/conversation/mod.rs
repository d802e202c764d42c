//! Conversation model: messages, modes, the state store and the image gallery.

mod gallery;
mod message;
mod mode;
mod state;

pub use gallery::{Gallery, GeneratedImage};
pub use message::{Message, Part, Role};
pub use mode::{Mode, GREETING_ID};
pub use state::{ConversationState, ConversationStore, Snapshot};
