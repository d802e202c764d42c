//! The backend seam: streamed fragments, errors and the
//! [`GenerativeBackend`] trait.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use super::types::{FunctionCall, GenerateContentRequest};
use crate::conversation::GeneratedImage;

/// One incremental piece of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Text to append to the reply so far
    Text(String),
    /// A structured request to call a declared function, with the thought
    /// signature that must accompany it when it is sent back as history
    CallRequest {
        call: FunctionCall,
        thought_signature: Option<String>,
    },
}

/// Stream of fragments for one request, finite and ordered.
pub type FragmentStream = BoxStream<'static, Result<Fragment, BackendError>>;

/// Errors from the generative backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API key not set. Set GEMINI_API_KEY (or API_KEY) and try again.")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("The response was blocked: {0}")]
    Blocked(String),
    #[error("No image was generated. The response may have been blocked.")]
    NoImage,
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// A generative-AI service: streamed chat completion and image synthesis.
///
/// The client is injected wherever a session is built, so turn logic can
/// run against a scripted backend without a credential.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Start a streamed completion for `request` on `model`.
    async fn stream_generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, BackendError>;

    /// Generate one square PNG for `prompt` on `model`.
    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, BackendError>;
}
