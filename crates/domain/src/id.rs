//! Typed identifiers.
//!
//! [`DeviceId`] is the MegaD port number an operator configures; it is what
//! appears on the wire. [`RegistryHandle`] is the opaque reference handed out
//! by the external device registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest device id accepted in configuration.
pub const MIN_DEVICE_ID: u32 = 1;
/// Largest device id accepted in configuration.
pub const MAX_DEVICE_ID: u32 = 999;

/// MegaD device (port) identifier.
///
/// Any non-negative integer can be decoded from a topic; only
/// `1..=999` passes configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u32);

impl DeviceId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Check that the id lies in the configurable range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDeviceId`] outside `1..=999`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if (MIN_DEVICE_ID..=MAX_DEVICE_ID).contains(&self.0) {
            Ok(self)
        } else {
            Err(ConfigError::InvalidDeviceId(self.0))
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parse error for [`DeviceId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device id must be a plain decimal integer")]
pub struct ParseDeviceIdError;

impl FromStr for DeviceId {
    type Err = ParseDeviceIdError;

    // `u32::from_str` accepts a leading `+`; topics must be digits only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseDeviceIdError);
        }
        s.parse().map(Self).map_err(|_| ParseDeviceIdError)
    }
}

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Opaque reference to a device object owned by the external registry.
    RegistryHandle
);
