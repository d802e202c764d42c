//! Conversation modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Id of the seeded greeting message in every chat log.
pub const GREETING_ID: &str = "initial-message";

/// Which surface the client is working in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Chat,
    Code,
    Image,
}

impl Mode {
    pub fn all() -> [Mode; 3] {
        [Mode::Chat, Mode::Code, Mode::Image]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Chat => "chat",
            Mode::Code => "code",
            Mode::Image => "image",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Chat => "Chat",
            Mode::Code => "Code",
            Mode::Image => "Image",
        }
    }

    /// Whether this mode runs a chat session.
    pub fn is_chat(&self) -> bool {
        !matches!(self, Mode::Image)
    }

    /// Whether the reminder callable is declared to the model.
    pub fn uses_reminder_tool(&self) -> bool {
        matches!(self, Mode::Chat)
    }

    /// System instruction for the chat session in this mode.
    pub fn system_instruction(&self) -> &'static str {
        match self {
            Mode::Chat | Mode::Image => {
                "You are Abdo AI, a friendly and helpful assistant. Answer clearly and concisely. \
                 When the user asks to be reminded of something, call the setReminder function \
                 with the task and the exact date and time in ISO 8601 format."
            }
            Mode::Code => {
                "You are Abdo AI, an expert programming assistant. Write correct, idiomatic code, \
                 explain your reasoning briefly, and always put code in fenced markdown blocks \
                 tagged with the language."
            }
        }
    }

    /// Greeting shown as the first model message.
    pub fn greeting(&self) -> &'static str {
        match self {
            Mode::Chat => {
                "Hello! I am Abdo AI. How can I help you today? You can ask me anything or \
                 switch to image generation."
            }
            Mode::Code => {
                "Hi! I am Abdo AI in code mode. Share a snippet, an error message, or describe \
                 what you want to build."
            }
            Mode::Image => "Describe an image and I will generate it for you.",
        }
    }

    /// The seeded log for this mode: exactly one model message.
    pub fn seed(&self) -> Vec<Message> {
        vec![Message::model_text(GREETING_ID, self.greeting())]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Mode::Chat),
            "code" => Ok(Mode::Code),
            "image" | "img" => Ok(Mode::Image),
            other => Err(format!("Unknown mode: {} (expected chat, code or image)", other)),
        }
    }
}
