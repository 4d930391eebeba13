use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;

/// Hour window during which cleaning is permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// When false the window is always open
    pub enabled: bool,
    /// First hour of the window (0-23)
    pub start_hour: u32,
    /// Hour at which the window closes (0-23, may be lower than start_hour)
    pub end_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 3,
            end_hour: 5,
        }
    }
}

/// Configuration for the MKV metadata cleaner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Directories walked for container files
    pub source_roots: Vec<PathBuf>,
    /// Append-only list of files already cleaned
    pub ledger_path: PathBuf,
    /// Append the clean marker to the file stem
    pub add_clean_suffix: bool,
    /// Strip `www.site.tld` advertisements from file and audio track names
    pub remove_site_prefix: bool,
    /// Re-scan the roots forever instead of once
    pub watch_mode: bool,
    /// Seconds between scans in watch mode
    pub watch_interval_secs: u64,
    /// Execution window
    pub schedule: ScheduleConfig,
    /// Path to the mkvmerge binary
    pub mkvmerge_bin: PathBuf,
    /// Container extension, without the dot
    pub container_extension: String,
    /// Marker appended to cleaned file stems; names ending in it are never picked up
    pub clean_marker: String,
    /// Names ending in this marker are never picked up
    pub trailer_marker: String,
    /// Name of the temporary output written next to the file being cleaned
    pub temp_file_name: String,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl CleanerConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            source_roots: Vec::new(),
            ledger_path: PathBuf::from("cleanfile.txt"),
            add_clean_suffix: true,
            remove_site_prefix: true,
            watch_mode: false,
            watch_interval_secs: 60,
            schedule: ScheduleConfig::default(),
            mkvmerge_bin: PathBuf::from("mkvmerge"),
            container_extension: "mkv".to_string(),
            clean_marker: "clean".to_string(),
            trailer_marker: "trailer".to_string(),
            temp_file_name: "__tmp_clean.mkv".to_string(),
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path).map_err(|source| {
                    ConfigError::Read {
                        path: config_path.to_path_buf(),
                        source,
                    }
                })?;

                // TOML by extension, JSON otherwise
                config = if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    toml::from_str(&content).map_err(|e| ConfigError::Parse {
                        path: config_path.to_path_buf(),
                        message: e.to_string(),
                    })?
                } else {
                    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                        path: config_path.to_path_buf(),
                        message: e.to_string(),
                    })?
                };
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply overrides from the process environment
    pub fn from_file_and_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_config(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply env-style overrides. `lookup` returns the raw value for a key, if set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SOURCE_FOLDERS") {
            self.source_roots = serde_json::from_str::<Vec<PathBuf>>(&raw)
                .map_err(|source| ConfigError::SourceFolders { raw, source })?;
        } else if let Some(raw) = lookup("SOURCE_FOLDER") {
            if !raw.trim().is_empty() {
                self.source_roots = vec![PathBuf::from(raw)];
            }
        }

        if let Some(raw) = lookup("CLEANFILE_PATH") {
            self.ledger_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MKVMERGE_BIN") {
            self.mkvmerge_bin = PathBuf::from(raw);
        }

        if let Some(raw) = lookup("ADD_CLEAN_SUFFIX") {
            self.add_clean_suffix = env_bool("ADD_CLEAN_SUFFIX", &raw)?;
        }
        if let Some(raw) = lookup("REMOVE_SITE_PREFIX") {
            self.remove_site_prefix = env_bool("REMOVE_SITE_PREFIX", &raw)?;
        }
        if let Some(raw) = lookup("WATCH_MODE") {
            self.watch_mode = env_bool("WATCH_MODE", &raw)?;
        }
        if let Some(raw) = lookup("WATCH_INTERVAL") {
            self.watch_interval_secs = env_int("WATCH_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("ENABLE_SCHEDULING") {
            self.schedule.enabled = env_bool("ENABLE_SCHEDULING", &raw)?;
        }
        if let Some(raw) = lookup("START_HOUR") {
            self.schedule.start_hour = env_int("START_HOUR", &raw)?;
        }
        if let Some(raw) = lookup("END_HOUR") {
            self.schedule.end_hour = env_int("END_HOUR", &raw)?;
        }

        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.start_hour > 23 {
            return Err(ConfigError::HourOutOfRange {
                key: "START_HOUR",
                value: self.schedule.start_hour,
            });
        }
        if self.schedule.end_hour > 23 {
            return Err(ConfigError::HourOutOfRange {
                key: "END_HOUR",
                value: self.schedule.end_hour,
            });
        }
        Ok(())
    }
}

/// Parse a boolean value from a raw string, accepting common env-style forms.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    parse_bool(raw).ok_or_else(|| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        expected: "a boolean",
    })
}

fn env_int<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        expected: "a non-negative integer",
    })
}
