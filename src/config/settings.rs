use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tuning knobs for enumeration and action execution. Credentials never live
/// here; the Slack token comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_page_pause_ms")]
    pub page_pause_ms: u64,
    #[serde(default = "default_activity_batch_size")]
    pub activity_batch_size: usize,
    #[serde(default = "default_activity_batch_pause_ms")]
    pub activity_batch_pause_ms: u64,
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_page_size() -> u32 {
    200
}

fn default_page_pause_ms() -> u64 {
    1000
}

fn default_activity_batch_size() -> usize {
    10
}

fn default_activity_batch_pause_ms() -> u64 {
    1000
}

fn default_action_delay_ms() -> u64 {
    1000
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_batch_size() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_pause_ms: default_page_pause_ms(),
            activity_batch_size: default_activity_batch_size(),
            activity_batch_pause_ms: default_activity_batch_pause_ms(),
            action_delay_ms: default_action_delay_ms(),
            cache_ttl_hours: default_cache_ttl_hours(),
            batch_size: default_batch_size(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > 200 {
            return Err(ConfigError::Settings(format!(
                "page_size must be between 1 and 200, got {}",
                self.page_size
            )));
        }
        if self.activity_batch_size == 0 {
            return Err(ConfigError::Settings(
                "activity_batch_size must be at least 1".to_string(),
            ));
        }
        if self.cache_ttl_hours == 0 {
            return Err(ConfigError::Settings(
                "cache_ttl_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
