use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_UTILITY_MODEL,
};

/// Settings read from `config.toml`. Every field is optional; the accessors
/// fill in the built-in defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// OpenAI-compatible API root, e.g. the Gemini compatibility endpoint
    pub base_url: Option<String>,
    /// Model used for character replies
    pub chat_model: Option<String>,
    /// Model used for emotion classification and topic suggestions
    pub utility_model: Option<String>,
    /// Upper bound on each wait for the model, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Directory holding the user record and the character roster
    pub data_dir: Option<PathBuf>,
}

/// Keys accepted by `heartline config set`/`unset`.
pub const CONFIG_KEYS: [&str; 5] = [
    "base_url",
    "chat_model",
    "utility_model",
    "request_timeout_secs",
    "data_dir",
];

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn chat_model(&self) -> &str {
        self.chat_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }

    pub fn utility_model(&self) -> &str {
        self.utility_model.as_deref().unwrap_or(DEFAULT_UTILITY_MODEL)
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Updates one key from its string form. Returns an error message for
    /// unknown keys or unparsable values.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("Value for {key} must not be empty"));
        }
        match key {
            "base_url" => self.base_url = Some(value.to_string()),
            "chat_model" => self.chat_model = Some(value.to_string()),
            "utility_model" => self.utility_model = Some(value.to_string()),
            "request_timeout_secs" => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| format!("Invalid timeout: {value} (expected whole seconds)"))?;
                self.request_timeout_secs = Some(secs);
            }
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base_url" => self.base_url = None,
            "chat_model" => self.chat_model = None,
            "utility_model" => self.utility_model = None,
            "request_timeout_secs" => self.request_timeout_secs = None,
            "data_dir" => self.data_dir = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key: {key}. Available keys: {}",
        CONFIG_KEYS.join(", ")
    )
}

/// Shortens paths under the home directory to `~/...` for display.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
