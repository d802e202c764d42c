//! Settings stored as JSON in the XDG config directory.
//!
//! Precedence, lowest first: built-in defaults, `settings.json`, the
//! environment, command-line flags.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::XdgDirs;
use crate::conversation::Mode;
use crate::gemini::DEFAULT_BASE_URL;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Environment variables holding the API key, in lookup order.
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    /// Chat and code model
    pub model: String,
    pub image_model: String,
    pub base_url: String,
    /// Mode the REPL starts in
    pub default_mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_mode: Mode::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the XDG settings file, then apply the environment.
    pub fn load_default() -> Result<Self, SettingsError> {
        let mut settings = Self::load(&XdgDirs::new().settings_file())?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Take the API key from the first non-empty variable in
    /// [`API_KEY_VARS`].
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = API_KEY_VARS
            .iter()
            .filter_map(|var| lookup(var))
            .find(|value| !value.trim().is_empty())
        {
            self.api_key = Some(key);
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The API key, unless it is missing or blank.
    pub fn usable_api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|_| self.has_api_key())
    }
}
