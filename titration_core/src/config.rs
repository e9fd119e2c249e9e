//! Configuration file support for titrate.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/titrate/config.toml`.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Regimen and wording configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// First day of the first step; prompted for when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Regimen file; the built-in regimen is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regimen_path: Option<PathBuf>,

    #[serde(default = "default_mixture_volume")]
    pub mixture_volume: String,

    #[serde(default = "default_substance")]
    pub substance: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            regimen_path: None,
            mixture_volume: default_mixture_volume(),
            substance: default_substance(),
        }
    }
}

/// Calendar file format
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Ics,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ics" | "ical" | "icalendar" => Ok(ExportFormat::Ics),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{}' (expected ics or csv)", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Ics => write!(f, "ics"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Export destination configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: ExportFormat::default(),
            calendar_name: default_calendar_name(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("titrate")
}

fn default_mixture_volume() -> String {
    "3 oz".into()
}

fn default_substance() -> String {
    "cashew".into()
}

fn default_output() -> PathBuf {
    PathBuf::from("medication_schedule.ics")
}

fn default_calendar_name() -> String {
    "Medication Schedule".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("titrate")
            .join("config.toml")
    }

    /// Location of the persisted delay file
    pub fn delays_path(&self) -> PathBuf {
        self.data.data_dir.join("delays.json")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
