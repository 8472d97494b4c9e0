use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::core::backend::{GenerateRequest, ModelBackend};
use crate::core::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, FALLBACK_TOPIC_SUGGESTIONS, MAX_TOPIC_SUGGESTIONS,
};
use crate::core::emotion::Emotion;
use crate::core::error::ChatError;

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_TOPIC_SUGGESTIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Generates short follow-up prompts for a detected emotion.
#[derive(Clone)]
pub struct TopicSuggester {
    backend: Option<Arc<dyn ModelBackend>>,
    model: String,
    timeout: Duration,
}

impl TopicSuggester {
    pub fn new(backend: Option<Arc<dyn ModelBackend>>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn suggestion_prompt(emotion: Emotion) -> String {
        format!(
            "User feels \"{emotion}\". Suggest 3 short, healing conversation topics in **Chinese (Simplified)**. \
Return as a JSON array of strings. Example: [\"告诉我你今天的小确幸\", \"聊聊你喜欢的食物\"]"
        )
    }

    /// At most three prompts; the fixed fallback triple whenever the model
    /// cannot provide any.
    pub async fn suggest(&self, emotion: Emotion) -> Vec<String> {
        match self.try_suggest(emotion).await {
            Ok(topics) => topics,
            Err(err) => {
                warn!("{err}; using fallback topics");
                fallback_suggestions()
            }
        }
    }

    async fn try_suggest(&self, emotion: Emotion) -> Result<Vec<String>, ChatError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| ChatError::Suggestion("model endpoint not configured".into()))?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: Self::suggestion_prompt(emotion),
            json_output: true,
        };

        let answer = tokio::time::timeout(self.timeout, backend.generate(request))
            .await
            .map_err(|_| ChatError::Suggestion("timed out".into()))?
            .map_err(|err| ChatError::Suggestion(err.to_string()))?;

        parse_suggestions(&answer)
    }
}

/// Accepts a bare JSON array of strings, or an object whose only array
/// value holds them (some JSON modes insist on an object root). Short
/// answers are topped up from the fallback prompts to a full panel.
pub fn parse_suggestions(answer: &str) -> Result<Vec<String>, ChatError> {
    let value: serde_json::Value = serde_json::from_str(answer.trim())
        .map_err(|err| ChatError::Suggestion(format!("malformed JSON: {err}")))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => {
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                serde_json::Value::Array(items) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => items,
                _ => return Err(ChatError::Suggestion("no single topic array".into())),
            }
        }
        other => {
            return Err(ChatError::Suggestion(format!(
                "expected an array, got {other}"
            )))
        }
    };

    let mut topics: Vec<String> = items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(text) => {
                let text = text.trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        })
        .take(MAX_TOPIC_SUGGESTIONS)
        .collect();

    if topics.is_empty() {
        return Err(ChatError::Suggestion("no usable topics".into()));
    }
    for fallback in FALLBACK_TOPIC_SUGGESTIONS {
        if topics.len() >= MAX_TOPIC_SUGGESTIONS {
            break;
        }
        if !topics.iter().any(|t| t == fallback) {
            topics.push(fallback.to_string());
        }
    }
    Ok(topics)
}
