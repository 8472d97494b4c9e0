use std::error::Error;
use std::fmt;

/// Failures along the chat path.
///
/// Only [`ChatError::Initialization`] and [`ChatError::Generation`] ever reach
/// the user. Classification and suggestion failures are produced internally
/// and absorbed into safe defaults before they leave their component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// No model endpoint is configured, usually because the credential is missing.
    Initialization(String),

    /// A reply was requested before a session was opened.
    SessionNotStarted,

    /// Network or model failure while producing a reply.
    Generation(String),

    /// The emotion classification round trip failed.
    Classification(String),

    /// The topic suggestion round trip failed.
    Suggestion(String),
}

impl ChatError {
    /// Transient errors are worth retrying from the input box.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Generation(_))
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Initialization(reason) => {
                write!(f, "Chat is unavailable: {reason}")
            }
            ChatError::SessionNotStarted => write!(f, "Chat session not started"),
            ChatError::Generation(reason) => write!(f, "Reply generation failed: {reason}"),
            ChatError::Classification(reason) => {
                write!(f, "Emotion classification failed: {reason}")
            }
            ChatError::Suggestion(reason) => write!(f, "Topic suggestion failed: {reason}"),
        }
    }
}

impl Error for ChatError {}
