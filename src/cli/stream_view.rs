//! Line-buffered view of the in-flight model message.
//!
//! The store republishes the whole message on every delta. This view hands
//! out the text in markdown-safe blocks: complete lines, never splitting a
//! fenced code block. If the text is rewritten instead of extended (a
//! reminder confirmation replacing the streamed text) the old text is
//! final, so its unrendered tail is released before the new text starts.

use crate::conversation::{ConversationState, Message, Part, Role};

pub struct StreamView {
    /// Messages present before the turn started
    base_len: usize,
    /// Latest text of the in-flight message
    text: String,
    /// Byte offset into `text` already handed out
    rendered: usize,
    user_seen: bool,
}

impl StreamView {
    pub fn new(base_len: usize) -> Self {
        Self {
            base_len,
            text: String::new(),
            rendered: 0,
            user_seen: false,
        }
    }

    /// The model message appended by the current turn, if any.
    fn in_flight<'a>(&self, state: &'a ConversationState) -> Option<&'a Message> {
        state
            .messages
            .iter()
            .skip(self.base_len)
            .rev()
            .find(|m| m.role == Role::Model)
    }

    /// The turn's user message, the first time it is seen, if it carries
    /// attachment parts worth showing. Plain text was just typed and is
    /// not echoed.
    pub fn user_echo<'a>(&mut self, state: &'a ConversationState) -> Option<&'a Message> {
        if self.user_seen {
            return None;
        }
        let user = state
            .messages
            .get(self.base_len)
            .filter(|m| m.role == Role::User)?;
        self.user_seen = true;
        user.parts
            .iter()
            .any(|p| !matches!(p, Part::Text(_)))
            .then_some(user)
    }

    /// Move to `state`. Returns the blocks that became ready, in order.
    pub fn advance(&mut self, state: &ConversationState) -> Vec<String> {
        let Some(message) = self.in_flight(state) else {
            return Vec::new();
        };
        let text = message.text();
        if text == self.text {
            return Vec::new();
        }

        let mut ready = Vec::new();
        if !text.starts_with(self.text.as_str()) {
            ready.extend(self.take_tail());
            self.rendered = 0;
        }
        self.text = text;

        let end = self.rendered + renderable_end(&self.text[self.rendered..]);
        if end > self.rendered {
            ready.push(self.text[self.rendered..end].to_string());
            self.rendered = end;
        }
        ready
    }

    /// Whatever is left once the turn has settled.
    pub fn finish(&mut self) -> Option<String> {
        self.take_tail()
    }

    fn take_tail(&mut self) -> Option<String> {
        if self.rendered >= self.text.len() {
            return None;
        }
        let tail = self.text[self.rendered..].to_string();
        self.rendered = self.text.len();
        Some(tail)
    }
}

/// Length of the prefix of `pending` made of complete lines outside any
/// open code fence.
fn renderable_end(pending: &str) -> usize {
    let mut in_fence = false;
    let mut end = 0;
    let mut pos = 0;

    for line in pending.split_inclusive('\n') {
        if !line.ends_with('\n') {
            break;
        }
        pos += line.len();
        if line.starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence {
            end = pos;
        }
    }
    end
}
