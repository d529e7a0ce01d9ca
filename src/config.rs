use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenv::dotenv;
use thiserror::Error;
use tracing::info;

use crate::domain::services::events::DEFAULT_CAPACITY;

const APP_ID: &str = "APP_ID";
const EVENT_BUS_CAPACITY: &str = "EVENT_BUS_CAPACITY";
const AUDIT_LOG_DIR: &str = "AUDIT_LOG_DIR";
const AUDIT_EVENTS_PER_FILE: &str = "AUDIT_EVENTS_PER_FILE";

const DEFAULT_APP_ID: &str = "participation-admission";
const DEFAULT_EVENTS_PER_FILE: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for environment variable {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub app_id: String,
    /// Buffered audit events per subscriber before a slow one starts lagging
    pub event_bus_capacity: usize,
    /// When set, audit events are appended to JSON-lines files here
    pub audit_log_dir: Option<PathBuf>,
    pub audit_events_per_file: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_id: DEFAULT_APP_ID.to_string(),
            event_bus_capacity: DEFAULT_CAPACITY,
            audit_log_dir: None,
            audit_events_per_file: DEFAULT_EVENTS_PER_FILE,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn try_from_env() -> Result<Config, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from a key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let app_id = lookup(APP_ID)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.app_id);

        let event_bus_capacity =
            parse_positive(&lookup, EVENT_BUS_CAPACITY)?.unwrap_or(defaults.event_bus_capacity);

        let audit_log_dir = lookup(AUDIT_LOG_DIR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let audit_events_per_file =
            parse_positive(&lookup, AUDIT_EVENTS_PER_FILE)?.unwrap_or(defaults.audit_events_per_file);

        info!(
            "Loaded config: app_id={}, event_bus_capacity={}, audit_log_dir={:?}",
            app_id, event_bus_capacity, audit_log_dir
        );

        Ok(Config {
            app_id,
            event_bus_capacity,
            audit_log_dir,
            audit_events_per_file,
        })
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    match usize::from_str(raw.trim()) {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}
