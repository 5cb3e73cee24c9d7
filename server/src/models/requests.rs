use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /api/generate-summary`
///
/// `notes` stays a raw JSON value: anything that is not a string sanitizes to
/// the empty string and then fails the length check.
#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub notes: Value,
}

/// Body of `POST /api/generate-podcast`
#[derive(Debug, Deserialize)]
pub struct PodcastRequest {
    #[serde(default)]
    pub summary: Value,
    #[serde(default)]
    pub voice: Option<String>,
}

impl PodcastRequest {
    /// Requested voice, ignoring blanks
    pub fn voice(&self) -> Option<&str> {
        self.voice
            .as_deref()
            .map(str::trim)
            .filter(|voice| !voice.is_empty())
    }
}

/// Body of `POST /api/generate-flashcards`
#[derive(Debug, Deserialize)]
pub struct FlashcardsRequest {
    #[serde(default)]
    pub notes: Value,
    #[serde(default)]
    pub count: Option<i64>,
}
