//! Chat message types.
//!
//! Defines the message structure shown in the conversation log.

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single typed fragment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text (markdown is left to the presentation layer)
    Text(String),
    /// Inline binary data, base64 encoded
    InlineData { mime_type: String, data: String },
    /// Display-only marker for a non-image attachment
    FileName(String),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn file_name(name: impl Into<String>) -> Self {
        Part::FileName(name.into())
    }

    /// Text content, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a user message with a fresh id.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            parts,
        }
    }

    /// Create an empty model placeholder with a fresh id.
    ///
    /// The id is fixed here, before any network call, so streamed text can
    /// be routed back to this message.
    pub fn model_placeholder() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Model,
            parts: vec![],
        }
    }

    /// Create a model message with a known id and text (seeded greetings).
    pub fn model_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// True when the message has no parts yet (an unfilled placeholder).
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_ids_are_unique() {
        let a = Message::user(vec![Part::text("hi")]);
        let b = Message::user(vec![Part::text("hi")]);
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, Role::User);
    }

    #[test]
    fn test_placeholder_is_empty_model_message() {
        let msg = Message::model_placeholder();
        assert_eq!(msg.role, Role::Model);
        assert!(msg.is_empty());
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn test_text_skips_non_text_parts() {
        let msg = Message::user(vec![
            Part::file_name("notes.txt"),
            Part::text("What does it say?"),
            Part::inline_data("image/png", "AAAA"),
        ]);
        assert_eq!(msg.text(), "What does it say?");
    }

    #[test]
    fn test_part_serializes_with_camel_case_tags() {
        let part = Part::inline_data("image/png", "AAAA");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inlineData"]["mime_type"], "image/png");

        let json = serde_json::to_value(Part::file_name("a.md")).unwrap();
        assert_eq!(json["fileName"], "a.md");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
