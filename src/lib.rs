//! Abdo AI Library
//!
//! A terminal client for Google's Gemini models: streamed chat with a
//! reminder callable, a code-assistant mode and image generation.
//!
//! ## Main Components
//!
//! - [`attachments`] - Turn user files into inline image data or document text
//! - [`cli`] - Command-line interface (REPL, commands, runner)
//! - [`config`] - Settings file, environment overrides and XDG paths
//! - [`conversation`] - Message log, modes and the image gallery
//! - [`gemini`] - REST client, SSE decoding and chat sessions
//! - [`tools`] - Client-side function declarations (`setReminder`)
//! - [`turn`] - Turn controller: streaming, call resolution and rollback
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use abdo_ai::{ChatController, GeminiClient, Settings};
//!
//! let settings = Settings::load_default()?;
//! let client = GeminiClient::new(settings.usable_api_key()).with_base_url(&settings.base_url);
//! let mut controller = ChatController::new(Arc::new(client), &settings);
//! controller.submit("Remind me to call Sam tomorrow at 9am", None).await;
//! ```

pub mod attachments;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod gemini;
pub mod tools;
pub mod turn;

// Re-export commonly used types
pub use attachments::{encode_attachment, AttachmentError, AttachmentSource, EncodedAttachment};
pub use config::{Settings, XdgDirs};
pub use conversation::{ConversationState, ConversationStore, Gallery, Message, Mode, Part, Role};
pub use gemini::{BackendError, ChatSession, Fragment, GeminiClient, GenerativeBackend};
pub use turn::{ChatController, ImageOutcome, TurnOutcome};
