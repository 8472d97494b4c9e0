//! Heartline is a terminal chat companion that talks to AI characters through
//! an OpenAI-compatible LLM API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the chat turn orchestration, model backend, emotion
//!   classification, topic suggestions, and local persistence.
//! - [`character`] defines companion characters, their defaults, and the
//!   persona instruction each conversation starts from.
//! - [`auth`] resolves API credentials from the environment or the keyring.
//! - [`api`] defines the `chat/completions` payloads used by the backend.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod character;
pub mod cli;
pub mod core;
pub mod utils;
