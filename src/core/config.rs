use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8455;

/// Finite so that pcsc-lite versions which busy-wait on an infinite
/// SCardGetStatusChange are avoided.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Settings for one run of the bridge. Fixed once the monitor starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Leave the reader's card-detection beep on
    pub beep: bool,
    /// Where card identifiers are sent
    pub host: String,
    pub port: u16,
    /// Press a key on a virtual keyboard before each identifier is sent
    pub keypress: bool,
    /// Switch to this user once readers and devices are open
    pub user: Option<String>,
    /// Tell systemd when the monitor is ready
    pub systemd: bool,
    /// Upper bound on each status change wait, in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            beep: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            keypress: false,
            user: None,
            systemd: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load settings from a JSON file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("Destination host must not be empty");
        }
        if self.port == 0 {
            bail!("Destination port must not be 0");
        }
        if self.timeout_secs == 0 {
            bail!("Timeout must be at least one second");
        }
        if matches!(&self.user, Some(user) if user.is_empty()) {
            bail!("User name must not be empty");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
