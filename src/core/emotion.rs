use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::backend::{GenerateRequest, ModelBackend};
use crate::core::error::ChatError;

/// Emotional tone of a message, drawn from a fixed closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Emotion {
    Joy,
    Sadness,
    Anxiety,
    Anger,
    #[default]
    Neutral,
    Tired,
    Hopeful,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anxiety,
        Emotion::Anger,
        Emotion::Neutral,
        Emotion::Tired,
        Emotion::Hopeful,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Joy => "Joy",
            Emotion::Sadness => "Sadness",
            Emotion::Anxiety => "Anxiety",
            Emotion::Anger => "Anger",
            Emotion::Neutral => "Neutral",
            Emotion::Tired => "Tired",
            Emotion::Hopeful => "Hopeful",
        }
    }

    /// Label shown to the user.
    pub fn display_label(self) -> &'static str {
        match self {
            Emotion::Joy => "快乐",
            Emotion::Sadness => "悲伤",
            Emotion::Anxiety => "焦虑",
            Emotion::Anger => "愤怒",
            Emotion::Neutral => "平静",
            Emotion::Tired => "疲惫",
            Emotion::Hopeful => "充满希望",
        }
    }

    /// Negative emotions trigger topic suggestions.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            Emotion::Sadness | Emotion::Anxiety | Emotion::Anger | Emotion::Tired
        )
    }

    fn from_word(word: &str) -> Option<Emotion> {
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str().eq_ignore_ascii_case(word))
    }

    /// Reads a model answer that should hold exactly one label.
    ///
    /// Quotes, punctuation and case are ignored. Answers naming two
    /// different labels are rejected.
    pub fn parse_label(text: &str) -> Option<Emotion> {
        let mut found = None;
        for word in text
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|w| !w.is_empty())
        {
            if let Some(emotion) = Emotion::from_word(word) {
                match found {
                    Some(previous) if previous != emotion => return None,
                    _ => found = Some(emotion),
                }
            }
        }
        found
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::from_word(s.trim()).ok_or_else(|| format!("unknown emotion: {s}"))
    }
}

/// Best-effort classifier of a message's emotional tone.
#[derive(Clone)]
pub struct EmotionClassifier {
    backend: Option<Arc<dyn ModelBackend>>,
    model: String,
    timeout: Duration,
}

impl EmotionClassifier {
    pub fn new(backend: Option<Arc<dyn ModelBackend>>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout: Duration::from_secs(crate::core::constants::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn classification_prompt(text: &str) -> String {
        let labels = Emotion::ALL.map(Emotion::as_str).join(", ");
        format!(
            "Analyze the emotion of the following text. Return ONLY ONE word from this list: [{labels}]. Text: \"{text}\""
        )
    }

    /// Never fails: any problem resolves to [`Emotion::Neutral`].
    pub async fn classify(&self, text: &str) -> Emotion {
        match self.try_classify(text).await {
            Ok(emotion) => {
                debug!(%emotion, "classified message");
                emotion
            }
            Err(err) => {
                warn!("{err}; falling back to Neutral");
                Emotion::Neutral
            }
        }
    }

    async fn try_classify(&self, text: &str) -> Result<Emotion, ChatError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| ChatError::Classification("model endpoint not configured".into()))?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: Self::classification_prompt(text),
            json_output: false,
        };

        let answer = tokio::time::timeout(self.timeout, backend.generate(request))
            .await
            .map_err(|_| ChatError::Classification("timed out".into()))?
            .map_err(|err| ChatError::Classification(err.to_string()))?;

        Emotion::parse_label(&answer)
            .ok_or_else(|| ChatError::Classification(format!("unrecognized label: {answer:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::testing::{GenerateScript, ScriptedBackend};

    fn classifier(backend: ScriptedBackend) -> (EmotionClassifier, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let shared: Arc<dyn ModelBackend> = backend.clone();
        (EmotionClassifier::new(Some(shared), "utility"), backend)
    }

    #[test]
    fn negative_set_is_exactly_four_labels() {
        let negative: Vec<Emotion> = Emotion::ALL.into_iter().filter(|e| e.is_negative()).collect();
        assert_eq!(
            negative,
            vec![Emotion::Sadness, Emotion::Anxiety, Emotion::Anger, Emotion::Tired]
        );
    }

    #[test]
    fn parse_label_tolerates_decoration() {
        assert_eq!(Emotion::parse_label("Anxiety"), Some(Emotion::Anxiety));
        assert_eq!(Emotion::parse_label("  anxiety.\n"), Some(Emotion::Anxiety));
        assert_eq!(Emotion::parse_label("\"Joy\""), Some(Emotion::Joy));
        assert_eq!(Emotion::parse_label("Emotion: TIRED"), Some(Emotion::Tired));
    }

    #[test]
    fn parse_label_rejects_ambiguous_or_unknown_answers() {
        assert_eq!(Emotion::parse_label("Joy or Sadness"), None);
        assert_eq!(Emotion::parse_label("Melancholy"), None);
        assert_eq!(Emotion::parse_label(""), None);
    }

    #[test]
    fn from_str_round_trips_names() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.to_string().parse::<Emotion>(), Ok(emotion));
        }
    }

    #[tokio::test]
    async fn classify_returns_model_label() {
        let (classifier, backend) =
            classifier(ScriptedBackend::new().with_generation(GenerateScript::Answer("Anxiety")));
        assert_eq!(classifier.classify("我今天很焦虑").await, Emotion::Anxiety);

        let prompts = backend.generate_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("我今天很焦虑"));
        assert!(prompts[0].contains("Hopeful"));
    }

    #[tokio::test]
    async fn classify_absorbs_request_failures() {
        let (classifier, _) =
            classifier(ScriptedBackend::new().with_generation(GenerateScript::Fail("503")));
        assert_eq!(classifier.classify("anything").await, Emotion::Neutral);
    }

    #[tokio::test]
    async fn classify_absorbs_unparsable_answers() {
        let (classifier, _) = classifier(
            ScriptedBackend::new().with_generation(GenerateScript::Answer("I cannot tell")),
        );
        assert_eq!(classifier.classify("anything").await, Emotion::Neutral);
    }

    #[tokio::test]
    async fn classify_without_backend_is_neutral() {
        let classifier = EmotionClassifier::new(None, "utility");
        assert_eq!(classifier.classify("anything").await, Emotion::Neutral);
    }

    #[tokio::test(start_paused = true)]
    async fn classify_times_out_to_neutral() {
        let (classifier, _) =
            classifier(ScriptedBackend::new().with_generation(GenerateScript::Hang));
        let classifier = classifier.with_timeout(Duration::from_secs(2));
        assert_eq!(classifier.classify("anything").await, Emotion::Neutral);
    }
}
