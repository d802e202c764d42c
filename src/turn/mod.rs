//! Turn handling: building the request, streaming the reply into the log
//! and answering call requests.

pub mod accumulator;
pub mod builder;
mod controller;
pub mod resolver;

use thiserror::Error;

use crate::attachments::AttachmentError;
use crate::gemini::BackendError;

pub use accumulator::{accumulate, StreamAccumulator, StreamOutcome};
pub use builder::{build_turn, TurnParts, DEFAULT_DOCUMENT_QUESTION};
pub use controller::{ChatController, ImageOutcome, TurnOutcome};
pub use resolver::{resolve, Resolution};

/// Anything that can end a turn early.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("The model returned an empty response. Please try again.")]
    EmptyReply,
}
