//! Configuration Management
//!
//! Handles persistent configuration storage for caredesk.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8090/";
pub const DEFAULT_RESOURCE: &str = "clinics";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment fallback for the backend URL
const BASE_URL_ENV: &str = "CAREDESK_BASE_URL";

/// Feedback display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub toast_duration_secs: u64,
    pub max_history: usize,
    /// "minimal" or "detailed"
    pub detail_level: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            toast_duration_secs: 5,
            max_history: 50,
            detail_level: "detailed".to_string(),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend base URL, e.g. http://localhost:8090/
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bound on a single backend call
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Last viewed resource
    #[serde(default)]
    pub last_resource: Option<String>,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("caredesk").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path; missing or unreadable files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective backend URL (config > CAREDESK_BASE_URL > default)
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Get effective request timeout
    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Get the resource to open first
    pub fn effective_resource(&self) -> String {
        self.last_resource
            .clone()
            .filter(|key| crate::resource::get_resource(key).is_some())
            .unwrap_or_else(|| DEFAULT_RESOURCE.to_string())
    }

    /// Set last viewed resource and save
    pub fn set_last_resource(&mut self, resource_key: &str) -> Result<()> {
        self.last_resource = Some(resource_key.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("caredesk-test-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(&temp_path());
        assert!(config.base_url.is_none());
        assert_eq!(config.effective_timeout(), Duration::from_secs(30));
        assert_eq!(config.effective_resource(), "clinics");
        assert!(config.notifications.enabled);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_path();
        let config = Config {
            base_url: Some("http://backend:9000/".to_string()),
            request_timeout_secs: Some(5),
            last_resource: Some("orders".to_string()),
            notifications: NotificationSettings {
                max_history: 10,
                ..NotificationSettings::default()
            },
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.effective_base_url(), "http://backend:9000/");
        assert_eq!(loaded.effective_timeout(), Duration::from_secs(5));
        assert_eq!(loaded.effective_resource(), "orders");
        assert_eq!(loaded.notifications.max_history, 10);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        let config = Config::load_from(&path);
        assert!(config.last_resource.is_none());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_unknown_last_resource_is_ignored() {
        let config = Config {
            last_resource: Some("spaceships".to_string()),
            ..Config::default()
        };
        assert_eq!(config.effective_resource(), DEFAULT_RESOURCE);
    }

    #[test]
    fn test_partial_notification_settings_use_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"notifications": {"max_history": 3}}"#).unwrap();
        assert_eq!(config.notifications.max_history, 3);
        assert_eq!(config.notifications.toast_duration_secs, 5);
        assert!(config.notifications.enabled);
    }
}
