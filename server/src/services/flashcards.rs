use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Flashcard;

lazy_static! {
    static ref JSON_FENCE_REGEX: Regex = Regex::new(r"```json\n?").unwrap();
    static ref FENCE_REGEX: Regex = Regex::new(r"```\n?").unwrap();
}

/// Remove markdown code fences the model likes to wrap JSON in
pub fn strip_code_fences(raw: &str) -> String {
    let text = JSON_FENCE_REGEX.replace_all(raw, "");
    let text = FENCE_REGEX.replace_all(&text, "");
    text.trim().to_string()
}

/// Parse model output as a flashcard array, keeping at most `count` cards
pub fn parse_flashcards(raw: &str, count: u32) -> Result<Vec<Flashcard>, serde_json::Error> {
    let mut cards: Vec<Flashcard> = serde_json::from_str(&strip_code_fences(raw))?;

    if cards.len() > count as usize {
        tracing::debug!(
            returned = cards.len(),
            requested = count,
            "Dropping extra flashcards"
        );
        cards.truncate(count as usize);
    }

    Ok(cards)
}
