//! Configuration management.

mod settings;
mod xdg;

pub use settings::{Settings, SettingsError, API_KEY_VARS, DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL};
pub use xdg::XdgDirs;
