use std::env;
use std::time::Duration;

use crate::audio::RetentionPolicy;

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Custom log directory path (overrides auto-detection)
    pub custom_log_dir: Option<String>,

    /// Filter for console output
    pub console_log_level: String,

    /// Filter for the JSON application log
    pub file_log_level: String,

    /// Write access.log and application.log (default: true)
    pub file_logging_enabled: bool,

    /// Log retention in days (default: 30)
    pub retention_days: u32,

    /// Maximum total log directory size in MB (default: 1000)
    pub max_total_size_mb: u64,

    /// Run the background log sweep (default: true)
    pub enable_cleanup: bool,

    /// Slow request threshold in milliseconds (default: 5000)
    pub slow_request_threshold_ms: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            custom_log_dir: None,
            console_log_level: "info".to_string(),
            file_log_level: "debug".to_string(),
            file_logging_enabled: true,
            retention_days: 30,
            max_total_size_mb: 1000,
            enable_cleanup: true,
            slow_request_threshold_ms: 5000,
        }
    }
}

impl LogConfig {
    /// Load logging configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("STUDYHIVE_LOG_DIR") {
            config.custom_log_dir = Some(dir);
        }

        config.console_log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "studyhive_server=info,tower_http=warn".to_string());

        if let Ok(level) = env::var("STUDYHIVE_FILE_LOG_LEVEL") {
            config.file_log_level = level;
        }

        if let Ok(val) = env::var("LOG_FILE_ENABLED") {
            config.file_logging_enabled = val.to_lowercase() == "true";
        }

        config.retention_days = parse_env("LOG_RETENTION_DAYS").unwrap_or(config.retention_days);
        config.max_total_size_mb =
            parse_env("LOG_MAX_TOTAL_SIZE_MB").unwrap_or(config.max_total_size_mb);

        if let Ok(val) = env::var("LOG_ENABLE_CLEANUP") {
            config.enable_cleanup = val.to_lowercase() == "true";
        }

        config.slow_request_threshold_ms = parse_env("LOG_SLOW_REQUEST_THRESHOLD_MS")
            .unwrap_or(config.slow_request_threshold_ms);

        config
    }

    /// Retention applied to rolled log files
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: Duration::from_secs(u64::from(self.retention_days) * 86400),
            max_total_size_mb: self.max_total_size_mb,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.file_log_level, "debug");
        assert!(config.file_logging_enabled);
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.max_total_size_mb, 1000);
        assert!(config.enable_cleanup);
        assert_eq!(config.slow_request_threshold_ms, 5000);
    }

    #[test]
    fn test_default_retention_matches_log_policy() {
        assert_eq!(
            LogConfig::default().retention_policy(),
            RetentionPolicy::logs_default()
        );
    }

    #[test]
    fn test_from_env_custom_values() {
        env::set_var("LOG_RETENTION_DAYS", "7");
        env::set_var("LOG_MAX_TOTAL_SIZE_MB", "not-a-number");
        env::set_var("LOG_ENABLE_CLEANUP", "false");

        let config = LogConfig::from_env();
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.max_total_size_mb, 1000);
        assert!(!config.enable_cleanup);
        assert_eq!(
            config.retention_policy().max_age,
            Duration::from_secs(7 * 86400)
        );

        env::remove_var("LOG_RETENTION_DAYS");
        env::remove_var("LOG_MAX_TOTAL_SIZE_MB");
        env::remove_var("LOG_ENABLE_CLEANUP");
    }
}
