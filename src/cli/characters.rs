use std::error::Error;

use clap::{Args, Subcommand};

use crate::character::{Character, CharacterDraft, CharacterRoster, Gender};
use crate::core::store::LocalStore;

#[derive(Subcommand)]
pub enum CharacterCommand {
    /// List every character in the roster
    List,
    /// Show one character in full
    Show {
        /// Character id or name
        character: String,
    },
    /// Create a character, or update one when --id names an existing character
    Add(CharacterFields),
    /// Delete a character
    Remove {
        /// Character id
        id: String,
    },
}

#[derive(Args, Default)]
pub struct CharacterFields {
    /// Existing id to edit; a new id is generated when omitted
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    /// Relationship to the user, e.g. 心理咨询师
    #[arg(long)]
    pub role: Option<String>,
    /// Male, Female or Non-Binary
    #[arg(long, value_parser = parse_gender)]
    pub gender: Option<Gender>,
    #[arg(long)]
    pub age: Option<String>,
    #[arg(long)]
    pub personality: Option<String>,
    #[arg(long)]
    pub tone: Option<String>,
    #[arg(long)]
    pub background: Option<String>,
    #[arg(long)]
    pub avatar: Option<String>,
    /// Repeat for several specialties
    #[arg(long = "specialty")]
    pub specialties: Vec<String>,
}

fn parse_gender(value: &str) -> Result<Gender, String> {
    Gender::parse(value).ok_or_else(|| format!("unknown gender: {value}"))
}

impl CharacterFields {
    /// Layers the given fields over `base`; unset fields keep their old value.
    fn into_draft(self, base: Option<&Character>) -> CharacterDraft {
        let mut draft = base.map(CharacterDraft::from).unwrap_or_default();
        let overrides = [
            (&mut draft.name, self.name),
            (&mut draft.role, self.role),
            (&mut draft.age, self.age),
            (&mut draft.personality, self.personality),
            (&mut draft.tone, self.tone),
            (&mut draft.background, self.background),
            (&mut draft.avatar, self.avatar),
        ];
        for (slot, value) in overrides {
            if value.is_some() {
                *slot = value;
            }
        }
        if self.gender.is_some() {
            draft.gender = self.gender;
        }
        if !self.specialties.is_empty() {
            draft.specialties = self.specialties;
        }
        draft.id = self.id.or(draft.id);
        draft
    }
}

pub fn run(store: &LocalStore, command: CharacterCommand) -> Result<(), Box<dyn Error>> {
    let mut roster = CharacterRoster::load(store)?;
    match command {
        CharacterCommand::List => list(&roster),
        CharacterCommand::Show { character } => match roster.resolve(&character) {
            Some(character) => show(character),
            None => return Err(format!("No character matches {character:?}").into()),
        },
        CharacterCommand::Add(fields) => {
            let character = upsert(&mut roster, fields)?;
            roster.save(store)?;
            println!("✓ Saved {} ({})", character.name, character.id);
        }
        CharacterCommand::Remove { id } => {
            if !roster.remove(&id) {
                return Err(format!("No character with id {id:?}").into());
            }
            roster.save(store)?;
            println!("✓ Removed {id}");
        }
    }
    Ok(())
}

fn upsert(roster: &mut CharacterRoster, fields: CharacterFields) -> Result<Character, Box<dyn Error>> {
    let existing = fields.id.as_deref().and_then(|id| roster.get(id)).cloned();
    let character = fields.into_draft(existing.as_ref()).normalize()?;
    let character = Character {
        // Edits keep usage history.
        last_interaction: existing.and_then(|c| c.last_interaction),
        ..character
    };
    roster.upsert(character.clone());
    Ok(character)
}

fn list(roster: &CharacterRoster) {
    if roster.is_empty() {
        println!("No characters yet.");
        println!("\n💡 Create one with:");
        println!("   heartline characters add --name <name> --role <role>");
        return;
    }
    println!("Characters:\n");
    for character in roster.list() {
        println!(
            "  • {} · {} ({}, {} chats)",
            character.name, character.role, character.id, character.usage_count
        );
    }
    println!("\n💡 Start a chat with:");
    println!("   heartline chat --character <id|name>");
}

fn show(character: &Character) {
    println!("{} ({})", character.name, character.id);
    println!("  role:        {}", character.role);
    println!("  gender:      {}", character.gender);
    println!("  age:         {}", character.age);
    println!("  personality: {}", character.personality);
    println!("  tone:        {}", character.tone);
    println!("  background:  {}", character.background);
    if !character.specialties.is_empty() {
        println!("  specialties: {}", character.specialties.join(", "));
    }
    println!("  avatar:      {}", character.avatar);
    println!("  chats:       {}", character.usage_count);
    if let Some(at) = character.last_interaction {
        println!("  last chat:   {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
}
