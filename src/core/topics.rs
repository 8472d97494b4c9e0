//! Curated conversation topics.

use std::fmt;

use crate::core::emotion::Emotion;
use crate::core::store::{LocalStore, StoreError, SAVED_TOPICS_KEY};

/// Opening questions offered for topics that do not define their own.
pub const DEFAULT_STARTER_QUESTIONS: [&str; 3] = [
    "我想听听你最近的烦恼",
    "你觉得这种情绪从何而来？",
    "如果可以，你希望现在做些什么？",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicCategory {
    Emotional,
    Life,
    Career,
    Study,
}

impl TopicCategory {
    pub const ALL: [TopicCategory; 4] = [
        TopicCategory::Emotional,
        TopicCategory::Life,
        TopicCategory::Career,
        TopicCategory::Study,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TopicCategory::Emotional => "Emotional",
            TopicCategory::Life => "Life",
            TopicCategory::Career => "Career",
            TopicCategory::Study => "Study",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TopicCategory::Emotional => "情感",
            TopicCategory::Life => "生活",
            TopicCategory::Career => "职场",
            TopicCategory::Study => "学习",
        }
    }

    /// Accepts the English name in any case or the Chinese label.
    pub fn parse(value: &str) -> Option<TopicCategory> {
        let value = value.trim();
        TopicCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value) || c.label() == value)
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Emotion display labels this topic is relevant to.
    pub emotion_tags: Vec<String>,
    pub category: TopicCategory,
    pub is_saved: bool,
    pub starter_questions: Vec<String>,
}

impl Topic {
    fn curated(
        id: &str,
        title: &str,
        description: &str,
        emotion_tags: &[&str],
        category: TopicCategory,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            emotion_tags: emotion_tags.iter().map(|t| t.to_string()).collect(),
            category,
            is_saved: false,
            starter_questions: DEFAULT_STARTER_QUESTIONS
                .iter()
                .map(|q| q.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: Vec<Topic>,
}

impl TopicCatalog {
    pub fn builtin() -> Self {
        use TopicCategory::*;
        Self {
            topics: vec![
                Topic::curated("t1", "克服焦虑", "应对突发压力的简单呼吸技巧。", &["焦虑"], Emotional),
                Topic::curated("t2", "工作与生活平衡", "如何在漫长的一天后彻底断开连接。", &["疲惫"], Career),
                Topic::curated("t3", "寻找快乐", "发现日常生活中的小确幸。", &["快乐", "平静"], Life),
                Topic::curated("t4", "专注力提升", "番茄工作法与思维清晰度。", &["焦虑"], Study),
                Topic::curated("t5", "面对失去", "度过悲伤，寻找内心的平静。", &["悲伤"], Emotional),
            ],
        }
    }

    /// Built-in catalog with favorites restored from the store.
    pub fn load(store: &LocalStore) -> Result<Self, StoreError> {
        let mut catalog = Self::builtin();
        let saved: Vec<String> = store.get(SAVED_TOPICS_KEY)?.unwrap_or_default();
        for topic in &mut catalog.topics {
            topic.is_saved = saved.contains(&topic.id);
        }
        Ok(catalog)
    }

    pub fn save(&self, store: &LocalStore) -> Result<(), StoreError> {
        let saved: Vec<&str> = self.saved().map(|t| t.id.as_str()).collect();
        store.put(SAVED_TOPICS_KEY, &saved)
    }

    pub fn list(&self, filter: Option<TopicCategory>) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| filter.is_none_or(|category| t.category == category))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Flips the favorite flag, returning the new value.
    pub fn toggle_saved(&mut self, id: &str) -> Option<bool> {
        let topic = self.topics.iter_mut().find(|t| t.id == id)?;
        topic.is_saved = !topic.is_saved;
        Some(topic.is_saved)
    }

    pub fn saved(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter().filter(|t| t.is_saved)
    }

    pub fn for_emotion(&self, emotion: Emotion) -> Vec<&Topic> {
        let label = emotion.display_label();
        self.topics
            .iter()
            .filter(|t| t.emotion_tags.iter().any(|tag| tag == label))
            .collect()
    }
}
