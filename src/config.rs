//! Configuration module
//!
//! Loaded from a TOML file, by default `~/.config/studyroom/config.toml`.
//! Every section is optional; a missing file yields the built-in defaults.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "text"
//!
//! [source]
//! path = "/var/lib/studyroom/attendance.json"
//!
//! [refresh]
//! interval_secs = 30
//! retry_attempts = 3
//!
//! [[time_slots]]
//! id = "lunch"
//! label = "점심"
//! time = "12:30-13:30"
//! cutoff = "12:30"
//!
//! [locations]
//! "채움터" = 9
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::{default_seat_counts, RefreshConfig};
use crate::domain::{TimeSlot, TimeSlotCatalog};
use crate::shared::utils::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid time range for slot '{slot}': {reason}")]
    InvalidTimeRange { slot: String, reason: String },

    #[error("Invalid slot catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub source: SourceConfig,
    pub refresh: RefreshSettings,
    pub checkin: CheckinConfig,
    pub time_slots: Vec<TimeSlotConfig>,
    /// Seat count per location; 0 books the room as a whole
    pub locations: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error (or any `EnvFilter` directive)
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON document holding reservations and attendance
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: dirs_next::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("studyroom")
                .join("attendance.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    /// Attempts per fetch, including the first
    pub retry_attempts: u32,
    pub shutdown_timeout_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            retry_attempts: 3,
            shutdown_timeout_secs: 10,
        }
    }
}

impl RefreshSettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_attempts(self.retry_attempts)
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval_secs: self.interval_secs,
            retry: self.retry_config(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    /// Location recorded on every check-in/out event
    pub location: String,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            location: "자기주도학습실".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotConfig {
    pub id: String,
    pub label: String,
    /// `"HH:MM-HH:MM"`
    pub time: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `"HH:MM"`; booking for the same day closes after this minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<String>,
}

fn default_true() -> bool {
    true
}

impl From<&TimeSlot> for TimeSlotConfig {
    fn from(slot: &TimeSlot) -> Self {
        Self {
            id: slot.id.clone(),
            label: slot.label.clone(),
            time: slot.time_range(),
            enabled: slot.enabled,
            cutoff: slot
                .booking_cutoff
                .map(|c| c.format("%H:%M").to_string()),
        }
    }
}

impl TimeSlotConfig {
    fn to_slot(&self) -> Result<TimeSlot, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTimeRange {
            slot: self.id.clone(),
            reason,
        };

        let mut slot = TimeSlot::new(self.id.clone(), self.label.clone(), &self.time)
            .map_err(|e| invalid(e.to_string()))?;
        if let Some(cutoff) = &self.cutoff {
            let cutoff = NaiveTime::parse_from_str(cutoff.trim(), "%H:%M")
                .map_err(|e| invalid(format!("cutoff '{}': {}", cutoff, e)))?;
            slot = slot.with_cutoff(cutoff);
        }
        if !self.enabled {
            slot = slot.disabled();
        }
        Ok(slot)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            source: SourceConfig::default(),
            refresh: RefreshSettings::default(),
            checkin: CheckinConfig::default(),
            time_slots: TimeSlotCatalog::default()
                .slots()
                .iter()
                .map(TimeSlotConfig::from)
                .collect(),
            locations: default_seat_counts().into_iter().collect(),
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh.interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.checkin.location.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "checkin.location",
                reason: "must not be empty".to_string(),
            });
        }
        self.catalog().map(|_| ())
    }

    /// Build the slot catalog from `[[time_slots]]`.
    pub fn catalog(&self) -> Result<TimeSlotCatalog, ConfigError> {
        let slots = self
            .time_slots
            .iter()
            .map(TimeSlotConfig::to_slot)
            .collect::<Result<Vec<_>, _>>()?;
        TimeSlotCatalog::new(slots).map_err(|e| ConfigError::InvalidCatalog(e.to_string()))
    }

    pub fn seat_counts(&self) -> std::collections::HashMap<String, u32> {
        self.locations
            .iter()
            .map(|(name, seats)| (name.clone(), *seats))
            .collect()
    }
}

/// `~/.config/studyroom/config.toml` (platform config dir)
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyroom")
        .join("config.toml")
}

// ── Tests ──────────────────────────────────────────────────────
