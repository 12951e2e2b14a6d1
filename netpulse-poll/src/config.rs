use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use netpulse_telemetry::{Category, Device, SnmpVersion};

/// Root configuration for the poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Devices to poll.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,

    /// Polling behavior.
    #[serde(default)]
    pub poll: PollSettings,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Polling behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollSettings {
    /// Poll repeatedly at this interval; absent means poll once and exit.
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// Restrict the interface listing to one category.
    #[serde(default)]
    pub category_filter: Option<Category>,
}

/// One device to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device name (used to label output records).
    pub name: String,

    /// Device host or address.
    pub host: String,

    /// SNMP agent port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SNMP community string.
    #[serde(default = "default_community")]
    pub community: String,

    /// SNMP version ("v1" or "v2c").
    #[serde(default)]
    pub version: SnmpVersion,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interface indices to sample traffic for; empty means every physical
    /// interface discovered on the device.
    #[serde(default)]
    pub interfaces: Vec<u32>,
}

fn default_port() -> u16 {
    161
}

fn default_community() -> String {
    "public".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

impl DeviceEntry {
    /// Build the per-poll device handle the core expects.
    pub fn device(&self) -> Device {
        Device {
            host: self.host.clone(),
            port: self.port,
            community: self.community.clone(),
            version: self.version,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl PollerConfig {
    /// Load configuration from a JSON5 file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&content)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = json5::from_str(content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for device in &self.devices {
            if device.name.is_empty() {
                bail!("device name cannot be empty");
            }
            if device.host.is_empty() {
                bail!("device '{}' has no host", device.name);
            }
        }
        Ok(())
    }
}
