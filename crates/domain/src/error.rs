//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`BridgeError`]
//! via `#[from]` or an explicit `into_domain()`. Only [`ConfigError`] is
//! allowed to abort startup; everything else is logged by the data path.

use crate::capability::Capability;
use crate::id::{DeviceId, RegistryHandle};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for every fallible operation in megabridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration rejected at startup.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// A publish or subscribe was attempted without a live broker session.
    #[error("MQTT transport not connected")]
    NotConnected,

    /// The broker could not be reached or dropped the connection.
    #[error("connectivity error")]
    Connectivity(#[source] BoxError),

    /// The registry device does not expose the capability we need.
    #[error("registry device {handle} lacks capability {capability}")]
    CapabilityMismatch {
        handle: RegistryHandle,
        capability: Capability,
    },

    /// A registry lookup found nothing.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The logging backend rejected a runtime change.
    #[error("logging error")]
    Logging(#[source] BoxError),
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("device id {0} is outside 1..=999")]
    InvalidDeviceId(u32),

    #[error("device {0} has an empty name")]
    EmptyName(DeviceId),

    #[error("device id {0} is configured more than once")]
    DuplicateDeviceId(DeviceId),

    #[error("invalid broker url {url:?}: {reason}")]
    InvalidBrokerUrl { url: String, reason: &'static str },
}

/// A lookup by identifier found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
