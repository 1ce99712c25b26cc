//! MQTT transport configuration.

use serde::Deserialize;
use url::{Host, Url};

use crate::error::MqttError;

const DEFAULT_PORT: u16 = 1883;

/// Configuration for the MQTT transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URL, e.g. `mqtt://192.168.1.10:1883`. Absent means degraded mode.
    pub broker: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Pause between polls after a connection error, in seconds.
    pub reconnect_delay_secs: u16,
    /// Capacity of the request and event channels.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: None,
            username: None,
            password: None,
            client_id: "megabridge".to_string(),
            keep_alive_secs: 30,
            reconnect_delay_secs: 5,
            channel_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Whether a broker is configured at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.broker.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    /// Parse the configured broker URL.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidUrl`] when no broker is configured or the
    /// URL is malformed.
    pub fn endpoint(&self) -> Result<BrokerEndpoint, MqttError> {
        match self.broker.as_deref() {
            Some(url) if !url.trim().is_empty() => BrokerEndpoint::parse(url),
            _ => Err(MqttError::InvalidUrl {
                url: String::new(),
                reason: "no broker configured",
            }),
        }
    }
}

/// Host and port extracted from a broker URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
}

impl BrokerEndpoint {
    /// Parse `mqtt://host[:port]` or `tcp://host[:port]`.
    ///
    /// IPv6 hosts are written in brackets and returned without them. Any
    /// path or query is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidUrl`] describing the first problem found.
    pub fn parse(url: &str) -> Result<Self, MqttError> {
        let invalid = |reason| MqttError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let parsed = Url::parse(url.trim()).map_err(|_| invalid("not a valid URL"))?;
        if !matches!(parsed.scheme(), "mqtt" | "tcp") {
            return Err(invalid("unsupported scheme, expected mqtt:// or tcp://"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials belong in username/password"));
        }

        let host = match parsed.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(invalid("missing host")),
        };
        let port = match parsed.port() {
            Some(0) => return Err(invalid("invalid port")),
            Some(port) => port,
            None => DEFAULT_PORT,
        };

        Ok(Self { host, port })
    }
}
