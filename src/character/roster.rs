//! The user's collection of characters.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::character::card::Character;
use crate::character::defaults::default_characters;
use crate::core::store::{LocalStore, StoreError, CHARACTERS_KEY};

#[derive(Debug, Clone, Default)]
pub struct CharacterRoster {
    characters: Vec<Character>,
}

impl CharacterRoster {
    pub fn new(characters: Vec<Character>) -> Self {
        Self { characters }
    }

    /// Persisted roster, or the seeded defaults when nothing was saved yet.
    pub fn load(store: &LocalStore) -> Result<Self, StoreError> {
        match store.get::<Vec<Character>>(CHARACTERS_KEY)? {
            Some(characters) => Ok(Self::new(characters)),
            None => {
                debug!("no saved characters, seeding defaults");
                Ok(Self::new(default_characters()))
            }
        }
    }

    /// An empty roster is written too; defaults are only seeded when the
    /// key has never been saved.
    pub fn save(&self, store: &LocalStore) -> Result<(), StoreError> {
        store.put(CHARACTERS_KEY, &self.characters)
    }

    pub fn list(&self) -> &[Character] {
        &self.characters
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Matches an id first, then a case-insensitive display name.
    pub fn resolve(&self, id_or_name: &str) -> Option<&Character> {
        self.get(id_or_name).or_else(|| {
            self.characters
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(id_or_name.trim()))
        })
    }

    pub fn first(&self) -> Option<&Character> {
        self.characters.first()
    }

    /// Replaces the character with the same id, or appends a new one.
    pub fn upsert(&mut self, character: Character) {
        match self.characters.iter_mut().find(|c| c.id == character.id) {
            Some(existing) => *existing = character,
            None => self.characters.push(character),
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.characters.len();
        self.characters.retain(|c| c.id != id);
        self.characters.len() != before
    }

    /// Bumps the usage counter of the character a chat was started with.
    pub fn record_interaction(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        let Some(current) = self.get(id) else {
            return false;
        };
        let updated = Character {
            usage_count: current.usage_count.saturating_add(1),
            last_interaction: Some(at),
            ..current.clone()
        };
        self.upsert(updated);
        true
    }
}
