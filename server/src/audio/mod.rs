//! Generated audio on disk: naming, persistence and retention.

pub mod retention;
pub mod store;

pub use retention::{spawn_sweeper, sweep, sweep_at, RetentionPolicy, SweepReport};
pub use store::{audio_url, AudioStore};
