//! Persona instruction for the remote model.

use crate::character::card::Character;

/// Formats a character into the system instruction sent with every turn.
///
/// Every field is embedded verbatim; the caller is expected to pass a
/// normalized character.
pub fn build_persona_instruction(character: &Character) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a roleplay AI.\n");
    prompt.push_str("**IMPORTANT**: You must reply in **Chinese (Simplified)**.\n\n");

    prompt.push_str(&format!("Name: {}\n", character.name));
    prompt.push_str(&format!("Age: {}\n", character.age));
    prompt.push_str(&format!("Gender: {}\n", character.gender));
    prompt.push_str(&format!("Role: {}\n", character.role));
    prompt.push_str(&format!("Personality: {}\n", character.personality));
    prompt.push_str(&format!("Tone of Voice: {}\n", character.tone));
    prompt.push_str(&format!("Background: {}\n", character.background));
    if !character.specialties.is_empty() {
        prompt.push_str(&format!(
            "Specialties: {}\n",
            character.specialties.join(", ")
        ));
    }

    prompt.push_str(
        "\nYour goal is to provide emotional support, companionship, and healing conversation.\n\
Never break character.\n\
If the user is sad, be comforting. If they are happy, celebrate with them.\n\
Keep responses concise and natural for a chat interface (usually 1-3 sentences), unless a deeper explanation is needed.\n",
    );

    prompt
}
