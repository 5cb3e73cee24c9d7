//! Text transformations between user input, model output and speech.

pub mod sanitize;
pub mod script;
pub mod ssml;

pub use sanitize::{sanitize, sanitize_default, sanitize_value};
pub use script::{shape_script, to_tts_payload, to_tts_payload_default};
pub use ssml::build_ssml;
