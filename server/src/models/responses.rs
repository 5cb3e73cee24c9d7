use serde::{Deserialize, Serialize};

/// One question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub q: String,
    pub a: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastResponse {
    pub success: bool,
    pub audio_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FlashcardsResponse {
    pub success: bool,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Seconds since the server started
    pub uptime: f64,
    pub environment: String,
    pub tts: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_podcast_response_uses_camel_case() {
        let response = PodcastResponse {
            success: true,
            audio_url: "/audio/podcast_1.mp3".to_string(),
            message: "Podcast generated successfully!".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["audioUrl"], "/audio/podcast_1.mp3");
        assert!(json.get("audio_url").is_none());
    }

    #[test]
    fn test_flashcards_response_serialization() {
        let response = FlashcardsResponse {
            success: true,
            flashcards: vec![Flashcard {
                q: "Q".to_string(),
                a: "A".to_string(),
            }],
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":true,"flashcards":[{"q":"Q","a":"A"}]}"#);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            uptime: 1.5,
            environment: "development".to_string(),
            tts: "configured".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["uptime"], 1.5);
        assert_eq!(json["tts"], "configured");
    }
}
