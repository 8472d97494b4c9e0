//! Persona-scoped conversation sessions over a [`ModelBackend`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::debug;

use crate::api::ChatMessage;
use crate::character::{build_persona_instruction, Character};
use crate::core::backend::{ChatTurnRequest, FragmentStream, ModelBackend};
use crate::core::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::core::error::ChatError;
use crate::core::message::{Message, MessageRole};

/// Context for one character chat: the persona instruction plus every
/// completed exchange so far.
///
/// Owned by whoever opened it. Nothing else holds a reference, so switching
/// characters is just dropping the old session.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    character_id: String,
    system_instruction: String,
    history: Vec<ChatMessage>,
}

impl ConversationSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn record_exchange(&mut self, user_text: &str, reply: &str) {
        self.history.push(ChatMessage::user(user_text));
        self.history
            .push(ChatMessage::new(MessageRole::Assistant.to_api_role(), reply));
    }
}

fn history_from_transcript(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| ChatMessage::new(m.role.to_api_role(), m.text.clone()))
        .collect()
}

#[derive(Clone)]
pub struct ConversationClient {
    backend: Option<Arc<dyn ModelBackend>>,
    model: String,
    timeout: Duration,
}

impl ConversationClient {
    pub fn new(backend: Option<Arc<dyn ModelBackend>>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Bounds both the wait for the stream to start and every fragment wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn open_session(
        &self,
        character: &Character,
        prior: &[Message],
    ) -> Result<ConversationSession, ChatError> {
        if self.backend.is_none() {
            return Err(ChatError::Initialization(
                "no API key configured; run `heartline auth` or set HEARTLINE_API_KEY".into(),
            ));
        }

        let session = ConversationSession {
            id: format!(
                "session-{}-{}",
                character.id,
                chrono::Utc::now().timestamp_millis()
            ),
            character_id: character.id.clone(),
            system_instruction: build_persona_instruction(character),
            history: history_from_transcript(prior),
        };
        debug!(session = %session.id, prior = session.history.len(), "opened session");
        Ok(session)
    }

    /// Starts a fresh generation for `text`. The exchange is added to the
    /// session history only once the reply finishes cleanly.
    pub async fn stream_reply<'a>(
        &self,
        session: Option<&'a mut ConversationSession>,
        text: &str,
    ) -> Result<ReplyStream<'a>, ChatError> {
        let session = session.ok_or(ChatError::SessionNotStarted)?;
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| ChatError::Initialization("model endpoint not configured".into()))?;

        let request = ChatTurnRequest {
            model: self.model.clone(),
            system_instruction: session.system_instruction.clone(),
            history: session.history.clone(),
            text: text.to_string(),
        };

        let inner = tokio::time::timeout(self.timeout, backend.stream_chat(request))
            .await
            .map_err(|_| ChatError::Generation("timed out waiting for the model".into()))??;

        Ok(ReplyStream {
            session,
            inner,
            user_text: text.to_string(),
            reply: String::new(),
            timeout: self.timeout,
            done: false,
        })
    }
}

/// Fragments of one reply, in generation order.
///
/// Dropping it before the end abandons the reply; the session history is
/// left as it was.
pub struct ReplyStream<'a> {
    session: &'a mut ConversationSession,
    inner: FragmentStream,
    user_text: String,
    reply: String,
    timeout: Duration,
    done: bool,
}

impl ReplyStream<'_> {
    /// `Ok(None)` marks the clean end of the reply.
    pub async fn next_fragment(&mut self) -> Result<Option<String>, ChatError> {
        if self.done {
            return Ok(None);
        }

        let next = match tokio::time::timeout(self.timeout, self.inner.next()).await {
            Ok(next) => next,
            Err(_) => {
                self.done = true;
                return Err(ChatError::Generation("timed out waiting for the model".into()));
            }
        };

        match next {
            Some(Ok(fragment)) => {
                self.reply.push_str(&fragment);
                Ok(Some(fragment))
            }
            Some(Err(err)) => {
                self.done = true;
                Err(err)
            }
            None => {
                self.done = true;
                self.session.record_exchange(&self.user_text, &self.reply);
                debug!(session = %self.session.id, chars = self.reply.len(), "reply finished");
                Ok(None)
            }
        }
    }

    pub fn text_so_far(&self) -> &str {
        &self.reply
    }
}
