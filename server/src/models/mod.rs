pub mod requests;
pub mod responses;

pub use requests::{FlashcardsRequest, PodcastRequest, SummaryRequest};
pub use responses::{
    Flashcard, FlashcardsResponse, HealthResponse, PodcastResponse, SummaryResponse,
};
