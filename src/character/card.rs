use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::character::defaults::DEFAULT_AVATARS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    Male,
    #[default]
    Female,
    #[serde(rename = "Non-Binary")]
    NonBinary,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NonBinary => "Non-Binary",
        }
    }

    pub fn parse(value: &str) -> Option<Gender> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "non-binary" | "non_binary" | "nonbinary" => Some(Gender::NonBinary),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-populated persona definition.
///
/// Characters are replaced wholesale on edit; nothing downstream mutates
/// individual fields. Build them through [`CharacterDraft::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub age: String,
    pub personality: String,
    pub tone: String,
    pub role: String,
    pub background: String,
    pub avatar: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterValidationError {
    MissingField(&'static str),
}

impl fmt::Display for CharacterValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterValidationError::MissingField(field) => {
                write!(f, "Character {field} is required")
            }
        }
    }
}

impl std::error::Error for CharacterValidationError {}

/// Form input for creating or editing a character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterDraft {
    pub id: Option<String>,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<String>,
    pub personality: Option<String>,
    pub tone: Option<String>,
    pub role: Option<String>,
    pub background: Option<String>,
    pub avatar: Option<String>,
    pub specialties: Vec<String>,
    pub usage_count: u32,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CharacterDraft {
    /// Validates required fields and fills every optional one.
    pub fn normalize(self) -> Result<Character, CharacterValidationError> {
        let name =
            non_blank(self.name).ok_or(CharacterValidationError::MissingField("name"))?;
        let role =
            non_blank(self.role).ok_or(CharacterValidationError::MissingField("role"))?;

        Ok(Character {
            id: non_blank(self.id).unwrap_or_else(generate_character_id),
            name,
            gender: self.gender.unwrap_or_default(),
            age: non_blank(self.age).unwrap_or_else(|| "未知".to_string()),
            personality: non_blank(self.personality).unwrap_or_else(|| "友好".to_string()),
            tone: non_blank(self.tone).unwrap_or_else(|| "平和".to_string()),
            role,
            background: non_blank(self.background)
                .unwrap_or_else(|| "暂无详细背景。".to_string()),
            avatar: non_blank(self.avatar).unwrap_or_else(|| DEFAULT_AVATARS[0].to_string()),
            specialties: self
                .specialties
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            usage_count: self.usage_count,
            last_interaction: None,
        })
    }
}

impl From<&Character> for CharacterDraft {
    fn from(character: &Character) -> Self {
        Self {
            id: Some(character.id.clone()),
            name: Some(character.name.clone()),
            gender: Some(character.gender),
            age: Some(character.age.clone()),
            personality: Some(character.personality.clone()),
            tone: Some(character.tone.clone()),
            role: Some(character.role.clone()),
            background: Some(character.background.clone()),
            avatar: Some(character.avatar.clone()),
            specialties: character.specialties.clone(),
            usage_count: character.usage_count,
        }
    }
}

/// `char_<unix millis>_<random hex>`.
pub fn generate_character_id() -> String {
    let mut suffix = [0_u8; 4];
    // A clock-only id is still unique enough for a single local roster.
    let _ = getrandom::fill(&mut suffix);
    let hex: String = suffix.iter().map(|b| format!("{b:02x}")).collect();
    format!("char_{}_{hex}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, role: &str) -> CharacterDraft {
        CharacterDraft {
            name: Some(name.to_string()),
            role: Some(role.to_string()),
            ..CharacterDraft::default()
        }
    }

    #[test]
    fn normalize_requires_name_and_role() {
        assert_eq!(
            draft("  ", "伙伴").normalize(),
            Err(CharacterValidationError::MissingField("name"))
        );
        assert_eq!(
            draft("Nova", "").normalize(),
            Err(CharacterValidationError::MissingField("role"))
        );
    }

    #[test]
    fn normalize_fills_defaults() {
        let character = draft(" Nova ", "情感治愈师").normalize().unwrap();
        assert_eq!(character.name, "Nova");
        assert_eq!(character.gender, Gender::Female);
        assert_eq!(character.age, "未知");
        assert_eq!(character.personality, "友好");
        assert_eq!(character.tone, "平和");
        assert_eq!(character.background, "暂无详细背景。");
        assert_eq!(character.avatar, DEFAULT_AVATARS[0]);
        assert!(character.id.starts_with("char_"));
        assert_eq!(character.usage_count, 0);
    }

    #[test]
    fn normalize_keeps_existing_id_and_cleans_tags() {
        let mut input = draft("Nova", "伙伴");
        input.id = Some("char_fixed".into());
        input.specialties = vec![" 深夜陪伴 ".into(), "".into(), "情感疏导".into()];
        let character = input.normalize().unwrap();
        assert_eq!(character.id, "char_fixed");
        assert_eq!(character.specialties, vec!["深夜陪伴", "情感疏导"]);
    }

    #[test]
    fn draft_round_trips_through_edit() {
        let original = draft("Nova", "伙伴").normalize().unwrap();
        let edited = CharacterDraft {
            tone: Some("轻柔".into()),
            ..CharacterDraft::from(&original)
        }
        .normalize()
        .unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.tone, "轻柔");
        assert_eq!(edited.name, original.name);
    }

    #[test]
    fn gender_uses_legacy_wire_names() {
        assert_eq!(
            serde_json::to_string(&Gender::NonBinary).unwrap(),
            "\"Non-Binary\""
        );
        assert_eq!(Gender::parse("nonbinary"), Some(Gender::NonBinary));
        assert_eq!(Gender::parse("MALE"), Some(Gender::Male));
        assert_eq!(Gender::parse("other"), None);
    }

    #[test]
    fn character_json_uses_camel_case() {
        let character = draft("Nova", "伙伴").normalize().unwrap();
        let json = serde_json::to_value(&character).unwrap();
        assert!(json.get("usageCount").is_some());
        assert!(json.get("lastInteraction").is_none());
    }
}
