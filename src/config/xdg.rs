//! XDG Base Directory support.

use std::path::PathBuf;

const APP_DIR: &str = "abdo";

/// XDG directory paths for Abdo.
pub struct XdgDirs {
    /// Config directory (~/.config/abdo or XDG_CONFIG_HOME/abdo)
    pub config: PathBuf,
    /// State directory (~/.local/state/abdo or XDG_STATE_HOME/abdo)
    pub state: PathBuf,
}

impl XdgDirs {
    /// Get XDG directories, respecting environment variables.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            config: std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".config"))
                .join(APP_DIR),
            state: std::env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".local/state"))
                .join(APP_DIR),
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.config, &self.state] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Path of the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config.join("settings.json")
    }

    /// Path of the line-editor history file.
    pub fn history_file(&self) -> PathBuf {
        self.state.join("history.txt")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
