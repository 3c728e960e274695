//! Configuration for the notification engine.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Path to the task snapshot file read by the daemon.
    pub tasks_file: Option<PathBuf>,
    /// Timing and lookahead settings for the periodic passes.
    pub scan: ScanConfig,
    /// Current user identity for ledger scoping and email addressing.
    pub user: UserConfig,
    /// Outbound mail API settings.
    pub email: EmailConfig,
    /// Realtime alert channel settings.
    pub channel: ChannelConfig,
    /// Notification ledger persistence settings.
    pub ledger: LedgerConfig,
}

/// Timing and window settings for the reminder and deadline passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seconds between engine ticks.
    pub tick_secs: u64,
    /// Lookahead window in calendar days for deadline alerts.
    pub lookahead_days: i64,
    /// Hour of day (0-23) assumed when a task has no due time.
    pub default_due_hour: u8,
    /// Minute of hour assumed when a task has no due time.
    pub default_due_min: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            lookahead_days: 4,
            default_due_hour: 9,
            default_due_min: 0,
        }
    }
}

impl ScanConfig {
    /// Due time assumed for tasks without one (09:00 by default).
    /// Out-of-range configured values fall back to midnight.
    #[must_use]
    pub fn default_due_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(
            u32::from(self.default_due_hour),
            u32::from(self.default_due_min),
            0,
        )
        .unwrap_or(NaiveTime::MIN)
    }
}

/// Identity of the user the engine notifies on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Unique user identifier (scopes the notification ledger).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Address for deadline emails.
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "local".to_owned(),
            name: "Local User".to_owned(),
            email: String::new(),
        }
    }
}

/// Outbound mail API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Whether deadline emails are sent at all.
    pub enabled: bool,
    /// Mail API endpoint receiving JSON send requests.
    pub endpoint: String,
    /// Sender address placed in outgoing messages.
    pub from_address: String,
    /// Optional bearer token for the mail API.
    pub bearer_token: Option<String>,
}

/// Realtime alert channel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Whether the channel is connected at startup.
    pub enabled: bool,
    /// `ws://` or `wss://` URL of the alert push endpoint.
    pub url: String,
}

/// Notification ledger persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// State file override. Defaults to
    /// `~/.config/duewatch/notified.json` when unset.
    pub path: Option<PathBuf>,
    /// Whether entries older than the lookahead window are pruned on
    /// each tick.
    pub prune: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: None,
            prune: true,
        }
    }
}

impl NotifyConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::NotifyError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config
    /// cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::NotifyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path:
    /// `~/.config/duewatch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("duewatch").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("duewatch")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/duewatch-config/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NotifyConfig::default();
        assert_eq!(config.scan.tick_secs, 60);
        assert_eq!(config.scan.lookahead_days, 4);
        assert_eq!(
            config.scan.default_due_time(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert!(!config.email.enabled);
        assert!(!config.channel.enabled);
        assert!(config.ledger.prune);
    }

    #[test]
    fn out_of_range_due_time_falls_back_to_midnight() {
        let scan = ScanConfig {
            default_due_hour: 99,
            ..ScanConfig::default()
        };
        assert_eq!(scan.default_due_time(), NaiveTime::MIN);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = NotifyConfig::default();
        config.user.id = "u-42".to_owned();
        config.user.email = "dana@example.com".to_owned();
        config.email.enabled = true;
        config.email.endpoint = "https://mail.example.com/send".to_owned();
        config.channel.url = "wss://app.example.com/alerts".to_owned();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: NotifyConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.user.id, "u-42");
        assert!(restored.email.enabled);
        assert_eq!(restored.channel.url, "wss://app.example.com/alerts");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: NotifyConfig = toml::from_str(
            r#"
            [scan]
            lookahead_days = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.lookahead_days, 7);
        assert_eq!(config.scan.tick_secs, 60);
        assert_eq!(config.user.id, "local");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = NotifyConfig::default();
        config.scan.tick_secs = 30;
        config.save_to_file(&path).unwrap();

        let restored = NotifyConfig::from_file(&path).unwrap();
        assert_eq!(restored.scan.tick_secs, 30);
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = NotifyConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
