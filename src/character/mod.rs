pub mod card;
pub mod defaults;
pub mod persona;
pub mod roster;

pub use card::{Character, CharacterDraft, CharacterValidationError, Gender};
pub use persona::build_persona_instruction;
pub use roster::CharacterRoster;
