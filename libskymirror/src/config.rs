//! Configuration management for Skymirror
//!
//! All credentials (destination account, source API key, mailer password)
//! are opaque inputs supplied through the config file; nothing here
//! validates them beyond presence.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bluesky: BlueskyConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    pub mailer: Option<MailerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// PDS base URL.
    #[serde(default = "default_service")]
    pub service: String,
    /// Full handle, e.g. `mirror.bsky.social`.
    pub handle: String,
    /// App password created for this bot.
    pub app_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_api_host")]
    pub api_host: String,
    pub api_key: String,
    /// Identifier of the source list whose timeline is mirrored.
    pub list_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Seconds to sleep between poll cycles.
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval_secs: u64,
    /// Wall-clock budget; the loop terminates after
    /// `reboot_after_secs / sleep_interval_secs` cycles.
    #[serde(default = "default_reboot_after")]
    pub reboot_after_secs: u64,
    /// Per-cycle posting budget in units (one per item plus a size
    /// penalty); items past the ceiling are skipped for that cycle.
    #[serde(default = "default_max_units")]
    pub max_units_per_cycle: u32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            sleep_interval_secs: default_sleep_interval(),
            reboot_after_secs: default_reboot_after(),
            max_units_per_cycle: default_max_units(),
        }
    }
}

impl MirrorConfig {
    /// Number of poll cycles in one daemon run.
    pub fn cycle_budget(&self) -> u64 {
        if self.sleep_interval_secs == 0 {
            return 0;
        }
        self.reboot_after_secs / self.sleep_interval_secs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// `From` mailbox, e.g. `Mirror Bot <bot@example.com>`.
    pub from: String,
    /// `To` mailbox.
    pub to: String,
    /// Name used in the fixed alert subject line.
    pub module_name: String,
}

fn default_service() -> String {
    "https://bsky.social".to_string()
}

fn default_endpoint() -> String {
    "https://twitter-api45.p.rapidapi.com/listtimeline.php".to_string()
}

fn default_api_host() -> String {
    "twitter-api45.p.rapidapi.com".to_string()
}

fn default_sleep_interval() -> u64 {
    300
}

fn default_reboot_after() -> u64 {
    86_400
}

fn default_max_units() -> u32 {
    30
}

fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration with placeholder credentials
    pub fn default_config() -> Self {
        Self {
            bluesky: BlueskyConfig {
                service: default_service(),
                handle: "mirror.bsky.social".to_string(),
                app_password: String::new(),
            },
            source: SourceConfig {
                endpoint: default_endpoint(),
                api_host: default_api_host(),
                api_key: String::new(),
                list_id: String::new(),
            },
            mirror: MirrorConfig::default(),
            mailer: None,
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SKYMIRROR_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("skymirror").join("config.toml"))
}
