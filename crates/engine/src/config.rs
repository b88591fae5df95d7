//! Runtime configuration, loaded from TOML.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [executor]
//! max_steps = 1000
//!
//! [weather]
//! timeout_secs = 10
//! user_agent = "workflow-runner/0.1"
//!
//! [email]
//! from = "weather-alerts@example.com"
//! relay_url = "${MAIL_RELAY_URL}"
//! timeout_secs = 10
//! ```
//!
//! `${VAR}` references are replaced with the environment variable's value
//! before parsing; unset variables are left as written.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nodes::builtin::DEFAULT_FROM_ADDRESS;

use crate::executor::ExecutorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_from")]
    pub from: String,
    /// HTTP mail relay. Emails are captured in memory when unset.
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            relay_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("workflow-runner/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_from() -> String {
    DEFAULT_FROM_ADDRESS.to_string()
}

impl AppConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content))?)
    }
}

fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => result.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
