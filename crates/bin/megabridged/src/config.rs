//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `megabridge.toml` in the working directory, or at the path in
//! `MEGABRIDGE_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use serde::Deserialize;

use megabridge_adapter_mqtt::{MqttConfig, MqttError};
use megabridge_app::lifecycle::BridgeSettings;
use megabridge_domain::device::{self, DeviceConfig};

const DEFAULT_PATH: &str = "megabridge.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection. No broker means degraded mode.
    pub mqtt: MqttConfig,
    /// Actuators to expose. Omitted entirely, a single placeholder is used.
    pub devices: Vec<DeviceConfig>,
    /// Withdraw devices from the host on shutdown.
    pub unregister_on_shutdown: bool,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            devices: vec![DeviceConfig::placeholder()],
            unregister_on_shutdown: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "megabridge=info,rumqttc=warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the config file (if present), apply
    /// environment-variable overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("MEGABRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("MEGABRIDGE_MQTT_BROKER") {
            self.mqtt.broker = Some(val);
        }
        if let Some(val) = var("MEGABRIDGE_MQTT_USERNAME") {
            self.mqtt.username = Some(val);
        }
        if let Some(val) = var("MEGABRIDGE_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Some(val) = var("MEGABRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        device::validate_all(&self.devices)?;
        if self.mqtt.is_configured() {
            self.mqtt.endpoint()?;
        }
        Ok(())
    }

    /// What the lifecycle controller needs.
    #[must_use]
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            devices: self.devices.clone(),
            unregister_on_shutdown: self.unregister_on_shutdown,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// A device entry is invalid.
    #[error("invalid device configuration")]
    Device(#[from] megabridge_domain::error::ConfigError),
    /// The broker URL is invalid.
    #[error("invalid MQTT configuration")]
    Mqtt(#[from] MqttError),
}
