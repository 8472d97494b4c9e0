//! Fixed strings and defaults shared across the chat flow.

/// Gemini exposes an OpenAI-compatible surface under this prefix.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_UTILITY_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Environment variables checked, in order, for the API credential.
pub const API_KEY_ENV_VARS: [&str; 2] = ["HEARTLINE_API_KEY", "GEMINI_API_KEY"];

/// Appended as an assistant message whenever a reply cannot be produced.
pub const CONNECTION_ERROR_TEXT: &str = "错误：连接中断 (ERR_CONNECTION_LOST)。请重试传输。";

pub const FALLBACK_TOPIC_SUGGESTIONS: [&str; 3] =
    ["跟我说说今天发生的事", "什么事让你感到开心？", "我在这里听你说"];

pub const MAX_TOPIC_SUGGESTIONS: usize = 3;

pub fn greeting_for(character_name: &str) -> String {
    format!("你好！我是{character_name}。我在这里倾听，你今天感觉怎么样？")
}
