//! Gemini API access: wire types, the streaming client and chat sessions.

mod backend;
mod client;
mod session;
mod sse;
pub mod types;

pub use backend::{BackendError, Fragment, FragmentStream, GenerativeBackend};
pub use client::{fragment_stream, fragments_from_chunk, GeminiClient, DEFAULT_BASE_URL};
pub use session::{ChatSession, SessionConfig};
pub use sse::SseDecoder;
