//! Line-based chat REPL on top of [`ChatOrchestrator`].

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::auth::CredentialStore;
use crate::character::{Character, CharacterRoster};
use crate::core::backend::{HttpBackend, ModelBackend};
use crate::core::config::Config;
use crate::core::conversation::ConversationClient;
use crate::core::emotion::EmotionClassifier;
use crate::core::error::ChatError;
use crate::core::message::MessageRole;
use crate::core::orchestrator::{ChatEvent, ChatOrchestrator, IgnoreReason, SubmitOutcome};
use crate::core::store::LocalStore;
use crate::core::suggest::TopicSuggester;
use crate::core::user::UserSession;
use crate::utils::logging::TranscriptLog;

/// What the user typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput {
    Message(String),
    Suggestion(usize),
    Switch(String),
    Mood,
    ToggleLog,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> ReplInput {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplInput::Message(line.to_string());
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));
    match name {
        "quit" | "exit" => ReplInput::Quit,
        "switch" if !rest.is_empty() => ReplInput::Switch(rest.to_string()),
        "mood" => ReplInput::Mood,
        "log" => ReplInput::ToggleLog,
        "help" => ReplInput::Help,
        _ => match name.parse::<usize>() {
            Ok(n) if n >= 1 => ReplInput::Suggestion(n - 1),
            _ => ReplInput::Unknown(trimmed.to_string()),
        },
    }
}

/// Renders orchestrator events as terminal output.
struct EventPrinter<W: Write> {
    out: W,
    streaming: bool,
}

impl<W: Write> EventPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            streaming: false,
        }
    }

    fn end_stream_line(&mut self) -> io::Result<()> {
        if self.streaming {
            writeln!(self.out)?;
            self.streaming = false;
        }
        Ok(())
    }

    fn print(&mut self, event: ChatEvent, speaker: &str) -> io::Result<()> {
        if !matches!(event, ChatEvent::Fragment { .. }) {
            self.end_stream_line()?;
        }
        match event {
            ChatEvent::MessageAppended(message) if message.role == MessageRole::Assistant => {
                if message.text.is_empty() {
                    write!(self.out, "{speaker}: ")?;
                    self.streaming = true;
                } else {
                    writeln!(self.out, "{speaker}: {}", message.text)?;
                }
            }
            ChatEvent::MessageAppended(_) => {}
            ChatEvent::Fragment { text, .. } => write!(self.out, "{text}")?,
            ChatEvent::EmotionResolved { emotion, .. } => {
                writeln!(self.out, "  · 情绪：{}", emotion.display_label())?;
            }
            ChatEvent::SuggestionsShown(topics) => {
                writeln!(self.out, "  试试这样聊聊：")?;
                for (index, topic) in topics.iter().enumerate() {
                    writeln!(self.out, "    /{} {topic}", index + 1)?;
                }
            }
            ChatEvent::SuggestionsHidden | ChatEvent::StateChanged(_) => {}
        }
        self.out.flush()
    }

    fn show(&mut self, event: ChatEvent, speaker: &str) {
        if let Err(e) = self.print(event, speaker) {
            warn!("failed to write chat output: {e}");
        }
    }

    /// Prints whatever is already queued without waiting for more.
    fn drain(&mut self, events: &mut mpsc::UnboundedReceiver<ChatEvent>, speaker: &str) {
        while let Ok(event) = events.try_recv() {
            self.show(event, speaker);
        }
    }
}

fn pick_character(roster: &CharacterRoster, wanted: Option<&str>) -> Result<Character, Box<dyn Error>> {
    let found = match wanted {
        Some(wanted) => roster.resolve(wanted),
        None => roster.first(),
    };
    found.cloned().ok_or_else(|| match wanted {
        Some(wanted) => format!("No character matches {wanted:?}. See `heartline characters list`.").into(),
        None => "No characters available. Create one with `heartline characters add`.".into(),
    })
}

fn note_interaction(roster: &mut CharacterRoster, store: &LocalStore, id: &str) {
    roster.record_interaction(id, chrono::Utc::now());
    if let Err(e) = roster.save(store) {
        warn!("failed to save character usage: {e}");
    }
}

pub async fn run_chat(character: Option<String>, log: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let store = LocalStore::open(config.data_dir())?;

    let Some(credential) = CredentialStore::new().resolve()? else {
        eprintln!("💡 Store a key with `heartline auth`, or set HEARTLINE_API_KEY.");
        return Err(ChatError::Initialization("no API key configured".into()).into());
    };
    let backend: Arc<dyn ModelBackend> = Arc::new(HttpBackend::new(
        config.base_url(),
        credential.key,
        config.request_timeout(),
    )?);
    let timeout = config.request_timeout();
    let client =
        ConversationClient::new(Some(backend.clone()), config.chat_model()).with_timeout(timeout);
    let classifier =
        EmotionClassifier::new(Some(backend.clone()), config.utility_model()).with_timeout(timeout);
    let suggester =
        TopicSuggester::new(Some(backend), config.utility_model()).with_timeout(timeout);

    let mut roster = CharacterRoster::load(&store)?;
    let character = pick_character(&roster, character.as_deref())?;
    let user_name = UserSession::new(&store)
        .load()?
        .map(|user| user.name)
        .unwrap_or_else(|| "You".to_string());
    let mut transcript_log = match log {
        Some(path) => TranscriptLog::open(path)?,
        None => TranscriptLog::disabled(),
    };

    println!("💬 Chatting with {} ({})", character.name, character.role);
    println!("   /help for commands, Ctrl+C cancels a reply, /quit leaves");
    if transcript_log.is_active() {
        println!("   📝 Transcript log: {}", transcript_log.status());
    }
    println!();

    note_interaction(&mut roster, &store, &character.id);
    let (mut orchestrator, mut events) = ChatOrchestrator::new(client, classifier, suggester, character);
    let mut printer = EventPrinter::new(io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut logged = 0;

    loop {
        let speaker = orchestrator.character().name.clone();
        printer.drain(&mut events, &speaker);

        let transcript = orchestrator.transcript().as_slice();
        for message in &transcript[logged.min(transcript.len())..] {
            if let Err(e) = transcript_log.log_message(message, &user_name, &speaker) {
                warn!("transcript log write failed: {e}");
            }
        }
        logged = transcript.len();

        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let text = match parse_input(&line) {
            ReplInput::Quit => break,
            ReplInput::Help => {
                println!("/1 /2 /3 send a suggestion · /switch <id|name> · /mood · /log · /quit");
                continue;
            }
            ReplInput::Mood => {
                print_mood(&orchestrator);
                continue;
            }
            ReplInput::ToggleLog => {
                match transcript_log.toggle() {
                    Ok(status) => println!("{status}"),
                    Err(e) => eprintln!("❌ {e}"),
                }
                continue;
            }
            ReplInput::Switch(wanted) => {
                match pick_character(&roster, Some(&wanted)) {
                    Ok(next) => {
                        note_interaction(&mut roster, &store, &next.id);
                        println!("💬 Now chatting with {} ({})", next.name, next.role);
                        orchestrator.switch_character(next);
                        logged = 0;
                    }
                    Err(e) => eprintln!("❌ {e}"),
                }
                continue;
            }
            ReplInput::Unknown(command) => {
                eprintln!("Unknown command: {command} (try /help)");
                continue;
            }
            ReplInput::Suggestion(index) => match orchestrator.pick_suggestion(index) {
                Some(text) => {
                    println!("> {text}");
                    text
                }
                None => {
                    eprintln!("No suggestion #{} is showing.", index + 1);
                    continue;
                }
            },
            ReplInput::Message(text) => text,
        };

        let canceller = orchestrator.cancel_handle();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                canceller.cancel();
            }
        });

        let submit = orchestrator.submit(&text);
        tokio::pin!(submit);
        let outcome = loop {
            tokio::select! {
                outcome = &mut submit => break outcome,
                Some(event) = events.recv() => printer.show(event, &speaker),
            }
        };
        interrupt.abort();
        printer.drain(&mut events, &speaker);
        if let Err(e) = printer.end_stream_line() {
            warn!("failed to write chat output: {e}");
        }

        match outcome {
            SubmitOutcome::Ignored(IgnoreReason::Blank) => {}
            SubmitOutcome::Ignored(reason) => eprintln!("Input ignored ({reason:?})."),
            SubmitOutcome::Failed(err) => warn!("turn failed: {err}"),
            SubmitOutcome::Cancelled => println!("(已取消)"),
            SubmitOutcome::Replied { .. } => {}
        }
    }

    orchestrator.abandon();
    println!("👋 再见");
    Ok(())
}

fn print_mood(orchestrator: &ChatOrchestrator) {
    let journal = orchestrator.mood();
    if journal.is_empty() {
        println!("No moods recorded yet.");
        return;
    }
    println!("Mood journal:");
    for entry in journal.entries() {
        println!(
            "  {} {} · {}",
            entry.timestamp.format("%H:%M"),
            entry.emotion.display_label(),
            entry.note
        );
    }
    if let Some(dominant) = journal.dominant() {
        println!("  Most frequent: {}", dominant.display_label());
    }
}
