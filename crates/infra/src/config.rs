//! Engine configuration from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `LOCKSTREAM_EVENT_LOG` | `data/event_log.jsonl` |
//! | `LOCKSTREAM_DATABASE_URL` | `sqlite::memory:` |
//! | `LOCKSTREAM_DEGRADE_THRESHOLD` | `3` |
//! | `LOCKSTREAM_EXPIRY_COUNTING` | `active-only` (or `unconditional`) |
//! | `LOCKSTREAM_REBUILD_ON_START` | `true` |

use std::path::PathBuf;

use thiserror::Error;

use crate::projections::{ExpiryCounting, ProjectorConfig};

pub const EVENT_LOG_VAR: &str = "LOCKSTREAM_EVENT_LOG";
pub const DATABASE_URL_VAR: &str = "LOCKSTREAM_DATABASE_URL";
pub const DEGRADE_THRESHOLD_VAR: &str = "LOCKSTREAM_DEGRADE_THRESHOLD";
pub const EXPIRY_COUNTING_VAR: &str = "LOCKSTREAM_EXPIRY_COUNTING";
pub const REBUILD_ON_START_VAR: &str = "LOCKSTREAM_REBUILD_ON_START";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub event_log_path: PathBuf,
    pub database_url: String,
    pub projector: ProjectorConfig,
    /// Replay the log into the read model before serving.
    pub rebuild_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_log_path: PathBuf::from("data/event_log.jsonl"),
            database_url: "sqlite::memory:".to_string(),
            projector: ProjectorConfig::default(),
            rebuild_on_start: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(EVENT_LOG_VAR) {
            config.event_log_path = PathBuf::from(path);
        }
        if let Some(url) = lookup(DATABASE_URL_VAR) {
            config.database_url = url;
        }
        if let Some(value) = lookup(DEGRADE_THRESHOLD_VAR) {
            config.projector.degrade_threshold =
                value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    var: DEGRADE_THRESHOLD_VAR,
                    reason: e.to_string(),
                    value,
                })?;
        }
        if let Some(value) = lookup(EXPIRY_COUNTING_VAR) {
            config.projector.expiry_counting = parse_expiry_counting(value)?;
        }
        if let Some(value) = lookup(REBUILD_ON_START_VAR) {
            config.rebuild_on_start = parse_bool(REBUILD_ON_START_VAR, value)?;
        }

        Ok(config)
    }
}

fn parse_expiry_counting(value: String) -> Result<ExpiryCounting, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "active-only" | "active_only" => Ok(ExpiryCounting::ActiveOnly),
        "unconditional" => Ok(ExpiryCounting::Unconditional),
        _ => Err(ConfigError::Invalid {
            var: EXPIRY_COUNTING_VAR,
            value,
            reason: "expected `active-only` or `unconditional`".to_string(),
        }),
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}
