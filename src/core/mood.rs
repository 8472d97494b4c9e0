//! In-memory mood journal. Nothing here is persisted; a new process starts
//! with an empty journal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::emotion::Emotion;

/// Longest note kept from the user's message, in characters.
const NOTE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct MoodRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub emotion: Emotion,
    pub note: String,
    pub related_session_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MoodJournal {
    entries: Vec<MoodRecord>,
}

fn truncate_note(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= NOTE_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut note: String = trimmed.chars().take(NOTE_MAX_CHARS).collect();
    note.push('…');
    note
}

impl MoodJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        emotion: Emotion,
        note: &str,
        related_session_id: Option<&str>,
    ) -> &MoodRecord {
        let record = MoodRecord {
            id: format!("mood-{}", self.entries.len() + 1),
            timestamp: Utc::now(),
            emotion,
            note: truncate_note(note),
            related_session_id: related_session_id.map(str::to_string),
        };
        self.entries.push(record);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[MoodRecord] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count per emotion, only for emotions that were seen.
    pub fn summary(&self) -> BTreeMap<Emotion, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.emotion).or_insert(0) += 1;
        }
        counts
    }

    /// Most frequent emotion; ties go to the one recorded most recently.
    pub fn dominant(&self) -> Option<Emotion> {
        let counts = self.summary();
        let best = counts.values().copied().max()?;
        self.entries
            .iter()
            .rev()
            .map(|entry| entry.emotion)
            .find(|emotion| counts.get(emotion) == Some(&best))
    }
}
