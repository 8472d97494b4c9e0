//! Command-line interface parsing and dispatch.

pub mod account;
pub mod characters;
pub mod chat;
pub mod settings;
pub mod topics;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::core::store::LocalStore;
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "heartline")]
#[command(about = "Talk with AI companion characters from your terminal")]
#[command(
    long_about = "Heartline is a chat companion: pick a character, talk to it through a streamed \
chat, and get gentle topic suggestions when the conversation turns heavy.\n\n\
Authentication:\n\
  Use 'heartline auth' to store an API key in your system keyring.\n\n\
Environment Variables (checked before the keyring):\n\
  HEARTLINE_API_KEY API key for the configured endpoint\n\
  GEMINI_API_KEY    Used when HEARTLINE_API_KEY is not set\n\
  HEARTLINE_LOG     Diagnostic log filter (default: warn)\n\n\
Chat commands:\n\
  /1 /2 /3          Send one of the suggested topics\n\
  /switch <id>      Talk to another character\n\
  /mood             Show the moods recorded this session\n\
  /log              Pause or resume transcript logging\n\
  /quit             Leave the chat\n\
  Ctrl+C            Cancel the reply in progress"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a chat (default)
    Chat {
        /// Character id or name to talk to
        #[arg(short, long)]
        character: Option<String>,
        /// Append the transcript to this file
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Sign in locally with a display name and email
    Login {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: String,
    },
    /// Forget the signed-in user
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Manage characters
    #[command(subcommand)]
    Characters(characters::CharacterCommand),
    /// Browse conversation topics
    #[command(subcommand)]
    Topics(topics::TopicCommand),
    /// Show or change configuration
    #[command(subcommand)]
    Config(settings::ConfigCommand),
    /// Print version and build information
    Version,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Chat {
        character: None,
        log: None,
    });

    match command {
        Commands::Chat { character, log } => chat::run_chat(character, log).await,
        Commands::Login { name, email } => account::login(&open_store()?, name.as_deref(), &email),
        Commands::Logout => account::logout(&open_store()?),
        Commands::Whoami => account::whoami(&open_store()?),
        Commands::Auth => account::auth(),
        Commands::Deauth => account::deauth(),
        Commands::Characters(command) => characters::run(&open_store()?, command),
        Commands::Topics(command) => topics::run(&open_store()?, command).await,
        Commands::Config(command) => settings::run(command),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Local store rooted where the config says, or the platform data dir.
pub(crate) fn open_store() -> Result<LocalStore, Box<dyn Error>> {
    let config = Config::load()?;
    Ok(LocalStore::open(config.data_dir())?)
}

fn print_version() {
    println!("heartline {}", env!("CARGO_PKG_VERSION"));
    println!("  git:   {} ({})", env!("VERGEN_GIT_DESCRIBE"), env!("VERGEN_GIT_SHA"));
    println!("  built: {}", env!("VERGEN_BUILD_TIMESTAMP"));
    println!("  rustc: {}", env!("VERGEN_RUSTC_SEMVER"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_chat() {
        let args = Args::try_parse_from(["heartline"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn chat_accepts_character_and_log() {
        let args =
            Args::try_parse_from(["heartline", "chat", "-c", "char_002", "--log", "talk.log"])
                .unwrap();
        match args.command {
            Some(Commands::Chat { character, log }) => {
                assert_eq!(character.as_deref(), Some("char_002"));
                assert_eq!(log, Some(PathBuf::from("talk.log")));
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn login_requires_email() {
        assert!(Args::try_parse_from(["heartline", "login", "--name", "Ada"]).is_err());
        let args =
            Args::try_parse_from(["heartline", "login", "--email", "ada@example.com"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Login { name: None, .. })
        ));
    }

    #[test]
    fn nested_subcommands_parse() {
        let args = Args::try_parse_from(["heartline", "topics", "list", "--category", "学习"])
            .unwrap();
        assert!(matches!(args.command, Some(Commands::Topics(_))));
        let args = Args::try_parse_from(["heartline", "characters", "remove", "char_003"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Characters(_))));
        let args =
            Args::try_parse_from(["heartline", "config", "set", "chat_model", "gemini-2.5-pro"])
                .unwrap();
        assert!(matches!(args.command, Some(Commands::Config(_))));
    }
}
