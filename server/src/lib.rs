// Library modules for the binary and integration tests
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod providers;
pub mod rate_limit;
pub mod server;
pub mod services;
pub mod text_processing;
pub mod utils;
