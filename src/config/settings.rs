//! Application settings and configuration types.
//!
//! Settings are persisted to `settings.json` in the platform config directory
//! (or the path in `TRIAGE_CONFIG`) and loaded at startup. A missing file
//! yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV_VAR: &str = "TRIAGE_CONFIG";

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no config directory available on this platform")]
    NoConfigDir,

    #[error("invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend locations.
    pub endpoints: EndpointSettings,
    /// Partitioning and folder naming.
    pub triage: TriageSettings,
    /// Profile sync loop timing.
    pub sync: SyncSettings,
}

impl Settings {
    /// Returns the settings path: `TRIAGE_CONFIG` if set, else the platform
    /// config directory.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let dirs = directories::ProjectDirs::from("io", "inquiry-triage", "inquiry-triage")
            .ok_or(SettingsError::NoConfigDir)?;
        Ok(dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from `path`, returning defaults if the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let settings: Self = serde_json::from_str(&contents)?;
                settings.validate()?;
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rejects values that would make every request or poll fail.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.endpoints.request_timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                field: "endpoints.request_timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.sync.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                field: "sync.poll_interval_ms",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Writes settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Base URLs of the two backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Root of the inquiry metadata service.
    pub metadata_base_url: String,
    /// Root of the mail-transport API, including the user segment.
    pub mail_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl EndpointSettings {
    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            metadata_base_url: "https://cosmosdbbackendplugin.azurewebsites.net".to_string(),
            mail_base_url: "https://graph.microsoft.com/v1.0/me".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Partitioning and folder naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageSettings {
    /// Emails rated strictly above this are eligible for acceptance.
    pub accept_threshold: f64,
    /// Prepended to the grouping key to name the accepted-drafts folder.
    pub accepted_folder_prefix: String,
    /// Prepended to the grouping key to name the rejected-drafts folder.
    pub rejected_folder_prefix: String,
}

impl TriageSettings {
    /// Folder display name for accepted drafts of a listing.
    pub fn accepted_folder(&self, folder_name: &str) -> String {
        format!("{}{}", self.accepted_folder_prefix, folder_name)
    }

    /// Folder display name for rejected drafts of a listing.
    pub fn rejected_folder(&self, folder_name: &str) -> String {
        format!("{}{}", self.rejected_folder_prefix, folder_name)
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            accept_threshold: 7.0,
            accepted_folder_prefix: "akzeptiert".to_string(),
            rejected_folder_prefix: "abgelehnt".to_string(),
        }
    }
}

/// Profile sync loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Fetch attempts before giving up on an item.
    pub max_attempts: u32,
    /// Pause between failed attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Steady polling period, in milliseconds.
    pub poll_interval_ms: u64,
}

impl SyncSettings {
    /// Retry pause as a `Duration`.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Polling period as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 2000,
            poll_interval_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.triage.accept_threshold, 7.0);
        assert_eq!(settings.sync.max_attempts, 5);
        assert_eq!(settings.sync.retry_delay(), Duration::from_secs(2));
        assert_eq!(settings.sync.poll_interval(), Duration::from_secs(2));
        assert!(settings.endpoints.mail_base_url.ends_with("/me"));
    }

    #[test]
    fn folder_names_use_prefixes() {
        let triage = TriageSettings::default();
        assert_eq!(triage.accepted_folder("Lindenweg"), "akzeptiertLindenweg");
        assert_eq!(triage.rejected_folder("Lindenweg"), "abgelehntLindenweg");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let json = r#"{"sync": {"max_attempts": 3}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.sync.max_attempts, 3);
        assert_eq!(settings.sync.retry_delay_ms, 2000);
        assert_eq!(settings.triage.accepted_folder_prefix, "akzeptiert");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.endpoints.request_timeout_secs, 30);
    }

    #[test]
    fn settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.endpoints.metadata_base_url = "http://localhost:7071".to_string();
        settings.triage.accept_threshold = 6.5;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.endpoints.metadata_base_url, "http://localhost:7071");
        assert_eq!(loaded.triage.accept_threshold, 6.5);
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"endpoints": {"request_timeout_secs": 0}}"#).unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "endpoints.request_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut settings = Settings::default();
        settings.sync.poll_interval_ms = 0;
        assert!(settings.validate().is_err());
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));
    }
}
