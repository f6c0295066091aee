//! Election configuration with TOML file support.

use fedvote_utils::{LogFormat, LoggingError};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConsensusError;

/// Tunables for an [`Election`](crate::Election).
///
/// Can be loaded from a TOML file via [`ElectionConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). None of these values affect which
/// volunteer is elected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Number of consecutive levels per leader inspected for flip-flopping.
    #[serde(default = "default_loop_window")]
    pub loop_window: usize,

    /// Whether a routing election answers idle peer traffic with its
    /// current vote.
    #[serde(default = "default_true")]
    pub rebroadcast_current_vote: bool,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

/// Smallest window in which an A-B-A alternation is visible.
pub const MIN_LOOP_WINDOW: usize = 3;

fn default_loop_window() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ElectionConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConsensusError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConsensusError> {
        let config: Self = toml::from_str(s).map_err(|e| ConsensusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConsensusError> {
        toml::to_string_pretty(self).map_err(|e| ConsensusError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.loop_window < MIN_LOOP_WINDOW {
            return Err(ConsensusError::Config(format!(
                "loop_window must be at least {MIN_LOOP_WINDOW}, got {}",
                self.loop_window
            )));
        }
        Ok(())
    }

    /// Install the global tracing subscriber described by this config.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        fedvote_utils::init_logging(self.log_format, &self.log_level)
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            loop_window: default_loop_window(),
            rebroadcast_current_vote: default_true(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ElectionConfig::default();
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = ElectionConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ElectionConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.loop_window, 4);
        assert!(config.rebroadcast_current_vote);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            loop_window = 6
            rebroadcast_current_vote = false
            log_format = "json"
        "#;
        let config = ElectionConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.loop_window, 6);
        assert!(!config.rebroadcast_current_vote);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn tiny_loop_window_is_rejected() {
        let err = ElectionConfig::from_toml_str("loop_window = 2").unwrap_err();
        assert!(matches!(err, ConsensusError::Config(msg) if msg.contains("loop_window")));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ElectionConfig::from_toml_str("loop_window = \"four\"").unwrap_err();
        assert!(matches!(err, ConsensusError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ElectionConfig::from_toml_file("/nonexistent/fedvote.toml").unwrap_err();
        assert!(matches!(err, ConsensusError::Io(_)));
    }
}
