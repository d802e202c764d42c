//! The chat controller: runs turns and owns everything a turn touches.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::accumulator::accumulate;
use super::builder::build_turn;
use super::resolver::{resolve, Resolution};
use super::TurnError;
use crate::attachments::{encode_attachment, AttachmentSource};
use crate::config::Settings;
use crate::conversation::{ConversationStore, Gallery, Message, Mode, Part, Snapshot};
use crate::gemini::types::WirePart;
use crate::gemini::{ChatSession, GenerativeBackend, SessionConfig};
use crate::tools::reminder_tools;

/// What happened to a submitted prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send, a turn already running, or no chat in this mode
    Ignored,
    Completed,
    /// The turn was rolled back; the message is also in the state's `error`
    Failed(String),
}

/// What happened to an image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Ignored,
    Generated,
    Failed(String),
}

pub struct ChatController {
    backend: Arc<dyn GenerativeBackend>,
    chat_model: String,
    image_model: String,
    mode: Mode,
    store: ConversationStore,
    gallery: Gallery,
    /// `None` in modes without chat
    session: Option<ChatSession>,
}

impl ChatController {
    /// Create a controller in the settings' default mode.
    pub fn new(backend: Arc<dyn GenerativeBackend>, settings: &Settings) -> Self {
        let mode = settings.default_mode;
        let mut controller = Self {
            backend,
            chat_model: settings.model.clone(),
            image_model: settings.image_model.clone(),
            mode,
            store: ConversationStore::with_messages(mode.seed()),
            gallery: Gallery::new(),
            session: None,
        };
        controller.session = controller.new_session(mode);
        controller
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn is_loading(&self) -> bool {
        self.store.snapshot().is_loading
    }

    fn new_session(&self, mode: Mode) -> Option<ChatSession> {
        if !mode.is_chat() {
            return None;
        }
        let tools = if mode.uses_reminder_tool() {
            reminder_tools()
        } else {
            vec![]
        };
        Some(ChatSession::new(
            Arc::clone(&self.backend),
            SessionConfig {
                model: self.chat_model.clone(),
                system_instruction: mode.system_instruction().to_string(),
                tools,
            },
        ))
    }

    /// Switch modes. Returns false if `mode` is already active.
    ///
    /// The log is reset to the new mode's greeting. The gallery is cleared
    /// only when leaving image mode.
    pub fn switch_mode(&mut self, mode: Mode) -> bool {
        if mode == self.mode {
            return false;
        }
        info!(from = %self.mode, to = %mode, "Switching mode");

        if self.mode == Mode::Image {
            self.gallery.clear();
        }
        self.mode = mode;
        self.session = self.new_session(mode);
        self.store.reset(mode.seed());
        true
    }

    /// Start over in the current mode with a fresh session.
    pub fn clear(&mut self) {
        debug!(mode = %self.mode, "Clearing conversation");
        self.session = self.new_session(self.mode);
        self.store.reset(self.mode.seed());
    }

    /// Run one chat turn.
    ///
    /// Every failure is handled here: the turn's messages are removed and
    /// the error is published in the state.
    pub async fn submit(
        &mut self,
        prompt: &str,
        attachment: Option<&AttachmentSource>,
    ) -> TurnOutcome {
        if self.store.snapshot().is_loading {
            debug!("Turn already in flight, ignoring submit");
            return TurnOutcome::Ignored;
        }
        if prompt.trim().is_empty() && attachment.is_none() {
            return TurnOutcome::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            debug!(mode = %self.mode, "No chat session in this mode");
            return TurnOutcome::Ignored;
        };

        self.store.set_error(None);

        let encoded = match attachment {
            Some(source) => encode_attachment(source).await.map(Some),
            None => Ok(None),
        };
        let encoded = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "Attachment rejected");
                let message = TurnError::from(e).to_string();
                self.store.set_error(Some(message.clone()));
                return TurnOutcome::Failed(message);
            }
        };

        let Some(turn) = build_turn(prompt, encoded.as_ref()) else {
            return TurnOutcome::Ignored;
        };

        let user = Message::user(turn.display);
        let model = Message::model_placeholder();
        let user_id = user.id.clone();
        let model_id = model.id.clone();

        self.store.append(user);
        self.store.append(model);
        self.store.set_loading(true);

        let result = run_turn(session, &self.store, &model_id, turn.wire).await;

        let outcome = match result {
            Ok(()) => {
                session.commit();
                TurnOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Turn failed, rolling back");
                session.discard();
                self.store.remove(&[&user_id, &model_id]);
                let message = e.to_string();
                self.store.set_error(Some(message.clone()));
                TurnOutcome::Failed(message)
            }
        };
        self.store.set_loading(false);
        outcome
    }

    /// Generate an image for `prompt` and put it at the front of the
    /// gallery. The message log is never touched.
    pub async fn generate_image(&mut self, prompt: &str) -> ImageOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() || self.store.snapshot().is_loading {
            return ImageOutcome::Ignored;
        }

        self.store.set_error(None);
        self.store.set_loading(true);

        let outcome = match self.backend.generate_image(&self.image_model, prompt).await {
            Ok(image) => {
                info!(mime_type = %image.mime_type, "Image generated");
                self.gallery.push_newest(image);
                ImageOutcome::Generated
            }
            Err(e) => {
                warn!(error = %e, "Image generation failed");
                let message = format!("Failed to generate image: {}", e);
                self.store.set_error(Some(message.clone()));
                ImageOutcome::Failed(message)
            }
        };
        self.store.set_loading(false);
        outcome
    }
}

/// Request, optional call resolution, continuation.
async fn run_turn(
    session: &mut ChatSession,
    store: &ConversationStore,
    message_id: &str,
    wire: Vec<WirePart>,
) -> Result<(), TurnError> {
    let stream = session.send_message_stream(wire).await?;

    let mut resolution: Option<Resolution> = None;
    let first = accumulate(store, message_id, stream, |call| {
        let resolved = resolve(call);
        if let Some(text) = &resolved.confirmation {
            store.replace_parts(message_id, vec![Part::text(text.clone())]);
        }
        resolution = Some(resolved);
    })
    .await?;
    if first.text.is_empty() && first.call_request.is_none() {
        return Err(TurnError::EmptyReply);
    }
    session.record_reply(first.wire_parts());

    let Some(resolution) = resolution else {
        return Ok(());
    };

    debug!(name = %resolution.response.name, "Sending function response");
    let stream = session
        .send_message_stream(vec![WirePart::function_response(resolution.response)])
        .await?;
    let second = accumulate(store, message_id, stream, |call| {
        debug!(name = %call.name, "Ignoring call request in continuation");
    })
    .await?;
    session.record_reply(second.wire_parts());
    Ok(())
}
