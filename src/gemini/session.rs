//! A multi-turn chat session bound to one model and system instruction.
//!
//! The session owns the wire-level history. Contents of the turn in flight
//! are staged and only join the history on [`ChatSession::commit`], so a
//! failed turn leaves the history exactly as it was.

use std::sync::Arc;

use tracing::debug;

use super::backend::{BackendError, FragmentStream, GenerativeBackend};
use super::types::{Content, GenerateContentRequest, Tool, WirePart};

/// Fixed configuration of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub system_instruction: String,
    pub tools: Vec<Tool>,
}

pub struct ChatSession {
    backend: Arc<dyn GenerativeBackend>,
    config: SessionConfig,
    history: Vec<Content>,
    staged: Vec<Content>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn GenerativeBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            history: Vec::new(),
            staged: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Committed contents, oldest first.
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Send user `parts` (a prompt or a function response) and stream the
    /// reply.
    pub async fn send_message_stream(
        &mut self,
        parts: Vec<WirePart>,
    ) -> Result<FragmentStream, BackendError> {
        self.staged.push(Content::user(parts));

        let contents: Vec<Content> = self
            .history
            .iter()
            .chain(self.staged.iter())
            .cloned()
            .collect();

        debug!(
            model = %self.config.model,
            history = self.history.len(),
            staged = self.staged.len(),
            "Sending message"
        );

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(self.config.system_instruction.clone())),
            tools: self.config.tools.clone(),
        };
        self.backend.stream_generate(&self.config.model, request).await
    }

    /// Record the model's reply to the last staged message.
    pub fn record_reply(&mut self, parts: Vec<WirePart>) {
        if !parts.is_empty() {
            self.staged.push(Content::model(parts));
        }
    }

    /// Move the staged turn into the history.
    pub fn commit(&mut self) {
        self.history.append(&mut self.staged);
    }

    /// Drop the staged turn.
    pub fn discard(&mut self) {
        if !self.staged.is_empty() {
            debug!(dropped = self.staged.len(), "Discarding staged contents");
        }
        self.staged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::GeneratedImage;
    use crate::gemini::backend::Fragment;
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use std::sync::Mutex;

    /// Records every request and replies with a single text fragment.
    #[derive(Default)]
    struct RecordingBackend {
        requests: Mutex<Vec<GenerateContentRequest>>,
    }

    #[async_trait]
    impl GenerativeBackend for RecordingBackend {
        async fn stream_generate(
            &self,
            _model: &str,
            request: GenerateContentRequest,
        ) -> Result<FragmentStream, BackendError> {
            self.requests.lock().unwrap().push(request);
            Ok(stream::iter(vec![Ok(Fragment::Text("ok".into()))]).boxed())
        }

        async fn generate_image(&self, _: &str, _: &str) -> Result<GeneratedImage, BackendError> {
            Err(BackendError::NoImage)
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            model: "gemini-2.5-flash".into(),
            system_instruction: "be brief".into(),
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_committed_turns_are_sent_as_history() {
        let backend = Arc::new(RecordingBackend::default());
        let mut session = ChatSession::new(backend.clone(), config());

        session.send_message_stream(vec![WirePart::text("one")]).await.unwrap();
        session.record_reply(vec![WirePart::text("ok")]);
        session.commit();
        assert_eq!(session.history().len(), 2);

        session.send_message_stream(vec![WirePart::text("two")]).await.unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let second = &requests[1];
        assert_eq!(second.contents.len(), 3);
        assert_eq!(second.contents[0].parts, vec![WirePart::text("one")]);
        assert_eq!(second.contents[1].role.as_deref(), Some("model"));
        assert_eq!(second.contents[2].parts, vec![WirePart::text("two")]);
        assert_eq!(
            second.system_instruction,
            Some(Content::system("be brief"))
        );
    }

    #[tokio::test]
    async fn test_discard_leaves_history_untouched() {
        let backend = Arc::new(RecordingBackend::default());
        let mut session = ChatSession::new(backend, config());

        session.send_message_stream(vec![WirePart::text("doomed")]).await.unwrap();
        session.discard();
        assert!(session.history().is_empty());

        session.commit();
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_empty_reply_is_not_recorded() {
        let mut session = ChatSession::new(Arc::new(RecordingBackend::default()), config());
        session.record_reply(vec![]);
        session.commit();
        assert!(session.history().is_empty());
    }
}
