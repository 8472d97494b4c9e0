pub mod backend;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod message;
pub mod mood;
pub mod orchestrator;
pub mod store;
pub mod suggest;
pub mod topics;
pub mod user;
