//! Turn-by-turn driver for one character chat.
//!
//! A turn appends the user's message, streams the reply into an assistant
//! placeholder while the emotion classifier runs alongside, then applies the
//! emotion and (for negative emotions) a panel of suggested prompts. Every
//! visible change is also published as a [`ChatEvent`] so a front end can
//! render incrementally.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::character::Character;
use crate::core::constants::{greeting_for, CONNECTION_ERROR_TEXT};
use crate::core::conversation::{ConversationClient, ConversationSession};
use crate::core::emotion::{Emotion, EmotionClassifier};
use crate::core::error::ChatError;
use crate::core::message::{Message, MessageRole, Transcript};
use crate::core::mood::MoodJournal;
use crate::core::suggest::TopicSuggester;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingReply,
    /// Entered only while the error message is appended.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    MessageAppended(Message),
    Fragment { message_id: String, text: String },
    StateChanged(ChatState),
    EmotionResolved { message_id: String, emotion: Emotion },
    SuggestionsShown(Vec<String>),
    SuggestionsHidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Blank,
    Busy,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Ignored(IgnoreReason),
    Replied {
        emotion: Emotion,
        suggestions_shown: bool,
    },
    /// The reply could not be produced; the error message was appended.
    Failed(ChatError),
    Cancelled,
}

/// Cancels the in-flight turn from outside the orchestrator, e.g. from a
/// Ctrl-C handler while `submit` is running.
#[derive(Debug, Clone)]
pub struct TurnCanceller {
    current: Arc<Mutex<Option<CancellationToken>>>,
    lifetime: CancellationToken,
}

impl TurnCanceller {
    fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            lifetime: CancellationToken::new(),
        }
    }

    fn begin_turn(&self) -> CancellationToken {
        let token = self.lifetime.child_token();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    fn end_turn(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Returns whether a turn was in flight.
    pub fn cancel(&self) -> bool {
        let token = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels the current turn and every later one.
    pub fn abandon(&self) {
        self.lifetime.cancel();
    }

    pub fn is_abandoned(&self) -> bool {
        self.lifetime.is_cancelled()
    }
}

enum StreamEnd {
    Completed,
    Cancelled,
}

pub struct ChatOrchestrator {
    client: ConversationClient,
    classifier: EmotionClassifier,
    suggester: TopicSuggester,
    character: Character,
    transcript: Transcript,
    greeting_id: String,
    session: Option<ConversationSession>,
    state: ChatState,
    current_emotion: Option<Emotion>,
    suggestions: Option<Vec<String>>,
    mood: MoodJournal,
    events: mpsc::UnboundedSender<ChatEvent>,
    canceller: TurnCanceller,
}

impl ChatOrchestrator {
    /// Starts a conversation with `character`, seeded with its greeting.
    pub fn new(
        client: ConversationClient,
        classifier: EmotionClassifier,
        suggester: TopicSuggester,
        character: Character,
    ) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let mut orchestrator = Self {
            client,
            classifier,
            suggester,
            character,
            transcript: Transcript::new(),
            greeting_id: String::new(),
            session: None,
            state: ChatState::Idle,
            current_emotion: None,
            suggestions: None,
            mood: MoodJournal::new(),
            events,
            canceller: TurnCanceller::new(),
        };
        orchestrator.greet();
        (orchestrator, receiver)
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_emotion(&self) -> Option<Emotion> {
        self.current_emotion
    }

    /// Visible suggestion panel, if any.
    pub fn suggestions(&self) -> Option<&[String]> {
        self.suggestions.as_deref()
    }

    pub fn mood(&self) -> &MoodJournal {
        &self.mood
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(ConversationSession::id)
    }

    pub fn cancel_handle(&self) -> TurnCanceller {
        self.canceller.clone()
    }

    /// Leaves the chat: the in-flight turn stops applying updates and later
    /// submissions are ignored.
    pub fn abandon(&self) {
        self.canceller.abandon();
    }

    pub fn is_abandoned(&self) -> bool {
        self.canceller.is_abandoned()
    }

    /// Drops the current session and transcript and greets as `character`.
    pub fn switch_character(&mut self, character: Character) {
        debug!(from = %self.character.id, to = %character.id, "switching character");
        self.canceller.cancel();
        self.character = character;
        self.session = None;
        self.transcript = Transcript::new();
        self.current_emotion = None;
        self.hide_suggestions();
        self.set_state(ChatState::Idle);
        self.greet();
    }

    /// Takes a prompt from the visible panel (zero-based) and hides it. The
    /// caller submits the returned text as the next input.
    pub fn pick_suggestion(&mut self, index: usize) -> Option<String> {
        let picked = self.suggestions.as_ref()?.get(index).cloned()?;
        self.hide_suggestions();
        Some(picked)
    }

    pub async fn submit(&mut self, input: &str) -> SubmitOutcome {
        if self.is_abandoned() {
            return SubmitOutcome::Ignored(IgnoreReason::Abandoned);
        }
        let text = input.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::Blank);
        }
        if self.state != ChatState::Idle {
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        }

        let turn = self.canceller.begin_turn();
        let outcome = self.run_turn(text, &turn).await;
        self.canceller.end_turn();
        self.set_state(ChatState::Idle);
        outcome
    }

    async fn run_turn(&mut self, text: &str, turn: &CancellationToken) -> SubmitOutcome {
        let user_id = self.append(MessageRole::User, text);
        self.set_state(ChatState::AwaitingReply);
        self.hide_suggestions();

        let classifier = self.classifier.clone();
        let owned_text = text.to_string();
        let mut classification =
            tokio::spawn(async move { classifier.classify(&owned_text).await });

        let placeholder_id = self.append(MessageRole::Assistant, "");
        match self
            .stream_into(&user_id, &placeholder_id, text, turn)
            .await
        {
            Ok(StreamEnd::Completed) => {}
            Ok(StreamEnd::Cancelled) => {
                classification.abort();
                debug!("turn cancelled while streaming");
                return SubmitOutcome::Cancelled;
            }
            Err(err) => {
                classification.abort();
                if self.is_abandoned() {
                    return SubmitOutcome::Cancelled;
                }
                warn!("reply failed: {err}");
                self.set_state(ChatState::Error);
                self.append(MessageRole::Assistant, CONNECTION_ERROR_TEXT);
                return SubmitOutcome::Failed(err);
            }
        }

        let emotion = tokio::select! {
            biased;
            _ = turn.cancelled() => {
                classification.abort();
                return SubmitOutcome::Cancelled;
            }
            joined = &mut classification => joined.unwrap_or_else(|err| {
                warn!("classification task failed: {err}");
                Emotion::Neutral
            }),
        };

        self.transcript.set_emotion(&user_id, emotion);
        self.current_emotion = Some(emotion);
        self.emit(ChatEvent::EmotionResolved {
            message_id: user_id,
            emotion,
        });
        let session_id = self.session_id().map(str::to_string);
        self.mood.record(emotion, text, session_id.as_deref());

        if !emotion.is_negative() {
            return SubmitOutcome::Replied {
                emotion,
                suggestions_shown: false,
            };
        }

        let suggestions = tokio::select! {
            biased;
            _ = turn.cancelled() => return SubmitOutcome::Cancelled,
            topics = self.suggester.suggest(emotion) => topics,
        };
        self.suggestions = Some(suggestions.clone());
        self.emit(ChatEvent::SuggestionsShown(suggestions));
        SubmitOutcome::Replied {
            emotion,
            suggestions_shown: true,
        }
    }

    /// Opens the session on first use, then streams the reply into the
    /// placeholder. Fields are touched directly while the reply stream holds
    /// the session borrow.
    async fn stream_into(
        &mut self,
        user_id: &str,
        placeholder_id: &str,
        text: &str,
        turn: &CancellationToken,
    ) -> Result<StreamEnd, ChatError> {
        if self.session.is_none() {
            let prior = self.prior_context(&[user_id, placeholder_id]);
            self.session = Some(self.client.open_session(&self.character, &prior)?);
        }

        let start = self.client.stream_reply(self.session.as_mut(), text);
        let mut reply = tokio::select! {
            biased;
            _ = turn.cancelled() => return Ok(StreamEnd::Cancelled),
            started = start => started?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = turn.cancelled() => return Ok(StreamEnd::Cancelled),
                next = reply.next_fragment() => next?,
            };
            let Some(fragment) = next else {
                return Ok(StreamEnd::Completed);
            };
            if turn.is_cancelled() {
                return Ok(StreamEnd::Cancelled);
            }
            self.transcript.append_to(placeholder_id, &fragment);
            if !self.canceller.is_abandoned() {
                let _ = self.events.send(ChatEvent::Fragment {
                    message_id: placeholder_id.to_string(),
                    text: fragment,
                });
            }
        }
    }

    /// Earlier messages worth carrying into a freshly opened session: the
    /// greeting, the `pending` turn and error entries are left out.
    fn prior_context(&self, pending: &[&str]) -> Vec<Message> {
        self.transcript
            .iter()
            .filter(|m| m.id != self.greeting_id && !pending.contains(&m.id.as_str()))
            .filter(|m| m.text != CONNECTION_ERROR_TEXT)
            .cloned()
            .collect()
    }

    fn greet(&mut self) {
        let greeting = greeting_for(&self.character.name);
        self.greeting_id = self.append(MessageRole::Assistant, &greeting);
    }

    fn append(&mut self, role: MessageRole, text: &str) -> String {
        let message = self.transcript.push(role, text).clone();
        let id = message.id.clone();
        self.emit(ChatEvent::MessageAppended(message));
        id
    }

    fn hide_suggestions(&mut self) {
        if self.suggestions.take().is_some() {
            self.emit(ChatEvent::SuggestionsHidden);
        }
    }

    fn set_state(&mut self, state: ChatState) {
        if self.state != state {
            self.state = state;
            self.emit(ChatEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: ChatEvent) {
        if self.canceller.is_abandoned() {
            return;
        }
        let _ = self.events.send(event);
    }
}
