use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

/// Time between two scheduler ticks. Not configurable at runtime.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// HTTP mail relay used for alert emails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailConfig {
    pub endpoint: String,
    pub api_token: String,
}

/// Static service configuration, loaded once at startup.
///
/// Example TOML:
/// ```toml
/// cities = ["Delhi", "Mumbai"]
/// alert_threshold = 35.0
/// api_key = "..."
/// email_alert_enabled = true
/// email_recipient = "ops@example.com"
///
/// [mail]
/// endpoint = "https://mail.example.com/v1/send"
/// api_token = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub cities: Vec<String>,

    /// Degrees Celsius. Alerts fire strictly above this value.
    pub alert_threshold: f64,

    pub api_key: String,

    /// Provider short name, "openweather" or "weatherapi".
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub email_alert_enabled: bool,

    #[serde(default)]
    pub email_recipient: String,

    /// Sender address; falls back to the `EMAIL_SENDER` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_sender: Option<String>,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// City served by the query endpoint when none is given.
    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,
}

fn default_provider() -> String {
    ProviderId::OpenWeather.as_str().to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("weather_data.db")
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_city() -> String {
    "Bangalore".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cities: Vec::new(),
            alert_threshold: 35.0,
            api_key: String::new(),
            provider: default_provider(),
            email_alert_enabled: false,
            email_recipient: String::new(),
            email_sender: None,
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            default_city: default_city(),
            mail: None,
        }
    }
}

impl Config {
    /// Return the configured provider as a strongly-typed ProviderId.
    pub fn provider_id(&self) -> Result<ProviderId> {
        ProviderId::try_from(self.provider.as_str())
    }

    pub fn set_provider(&mut self, id: ProviderId) {
        self.provider = id.as_str().to_string();
    }

    /// Sender address for alert emails, if one is known.
    pub fn resolved_email_sender(&self) -> Option<String> {
        self.email_sender
            .clone()
            .or_else(|| std::env::var("EMAIL_SENDER").ok())
            .filter(|s| !s.trim().is_empty())
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cities.iter().all(|c| c.trim().is_empty()) {
            bail!("No cities configured.\nHint: add at least one entry to `cities`.");
        }

        if self.api_key.trim().is_empty() {
            bail!(
                "No API key configured for provider '{}'.\n\
                 Hint: run `weather-monitor configure` and enter your API key.",
                self.provider
            );
        }

        if !self.alert_threshold.is_finite() {
            bail!("alert_threshold must be a finite number");
        }

        self.provider_id()?;

        if self.email_alert_enabled && self.email_recipient.trim().is_empty() {
            bail!("email_alert_enabled is set but email_recipient is empty");
        }

        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents).context("Failed to parse configuration TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from `path`, or from the platform config directory when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        let contents = fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config file: {}\n\
                 Hint: run `weather-monitor configure` to create one.",
                path.display()
            )
        })?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-monitor")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Cities with surrounding whitespace removed and blanks dropped.
    pub fn city_list(&self) -> Vec<String> {
        self.cities
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}
