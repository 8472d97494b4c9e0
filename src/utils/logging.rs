//! Diagnostics setup and the optional chat transcript log.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::core::message::{Message, MessageRole};

/// Environment variable holding the `tracing` filter directives.
pub const LOG_FILTER_ENV: &str = "HEARTLINE_LOG";

/// Installs the stderr subscriber. Defaults to `warn` so absorbed
/// classifier and suggester failures stay visible without debug noise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Appends finished chat messages to a plain-text file.
///
/// Logging starts active when a file is given and can be paused and resumed
/// from the REPL.
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn disabled() -> Self {
        Self {
            file_path: None,
            is_active: false,
        }
    }

    /// Checks the file is writable before accepting it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let mut log = Self::disabled();
        log.set_log_file(path.into())?;
        Ok(log)
    }

    pub fn set_log_file(&mut self, path: PathBuf) -> Result<String, Box<dyn Error>> {
        OpenOptions::new().create(true).append(true).open(&path)?;
        let status = format!("Logging to {}", path.display());
        self.file_path = Some(path);
        self.is_active = true;
        Ok(status)
    }

    /// Pauses or resumes logging, leaving a marker line when pausing.
    pub fn toggle(&mut self) -> Result<String, Box<dyn Error>> {
        let Some(path) = self.file_path.clone() else {
            return Err("No log file configured; start chat with --log <file>".into());
        };
        if self.is_active {
            self.write_block("## Logging paused")?;
            self.is_active = false;
            Ok(format!("Logging paused ({})", path.display()))
        } else {
            self.is_active = true;
            Ok(format!("Logging resumed ({})", path.display()))
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Writes one message. User lines carry the user's name; blank replies
    /// are skipped.
    pub fn log_message(
        &self,
        message: &Message,
        user_name: &str,
        character_name: &str,
    ) -> Result<(), Box<dyn Error>> {
        if !self.is_active || message.text.trim().is_empty() {
            return Ok(());
        }
        let speaker = match message.role {
            MessageRole::User => user_name,
            MessageRole::Assistant => character_name,
        };
        let mut block = format!("{speaker}: {}", message.text);
        if let Some(emotion) = message.emotion {
            block.push_str(&format!(" [{}]", emotion.display_label()));
        }
        self.write_block(&block)
    }

    pub fn status(&self) -> String {
        let file_name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }

    fn write_block(&self, content: &str) -> Result<(), Box<dyn Error>> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::emotion::Emotion;
    use std::fs;

    fn message(role: MessageRole, text: &str) -> Message {
        Message::new("msg-1", role, text)
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = TranscriptLog::disabled();
        assert!(!log.is_active());
        assert_eq!(log.status(), "disabled");
        log.log_message(&message(MessageRole::User, "hi"), "me", "Luna")
            .unwrap();
        assert!(TranscriptLog::disabled().toggle().is_err());
    }

    #[test]
    fn messages_are_appended_with_speakers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        let log = TranscriptLog::open(&path).unwrap();

        let mut user = message(MessageRole::User, "我有点累");
        user.emotion = Some(Emotion::Tired);
        log.log_message(&user, "小林", "Luna").unwrap();
        log.log_message(&message(MessageRole::Assistant, "休息一下吧\n喝杯茶"), "小林", "Luna")
            .unwrap();
        log.log_message(&message(MessageRole::Assistant, ""), "小林", "Luna")
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "小林: 我有点累 [疲惫]\n\nLuna: 休息一下吧\n喝杯茶\n\n");
    }

    #[test]
    fn toggle_pauses_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        let mut log = TranscriptLog::open(&path).unwrap();
        assert_eq!(log.status(), "active (chat.log)");

        log.toggle().unwrap();
        assert_eq!(log.status(), "paused (chat.log)");
        log.log_message(&message(MessageRole::User, "hidden"), "me", "Luna")
            .unwrap();
        log.toggle().unwrap();
        assert!(log.is_active());

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("## Logging paused"));
        assert!(!contents.contains("hidden"));
    }

    #[test]
    fn unwritable_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing_parent = dir.path().join("no-such-dir").join("chat.log");
        assert!(TranscriptLog::open(missing_parent).is_err());
    }
}
