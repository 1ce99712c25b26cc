//! Capabilities a registry device may expose.
//!
//! The external registry supports many capability profiles; megabridge only
//! needs the on/off subset. Capabilities are modelled as a tagged variant so
//! new ones can be added without a multi-capability base type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute name carrying the on/off state of an [`Capability::OnOff`] device.
pub const ON_OFF_ATTRIBUTE: &str = "on_off";

/// A single capability of a registry device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Capability {
    OnOff,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff => f.write_str("on_off"),
        }
    }
}

/// Named set of capabilities requested when creating a registry device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub name: String,
    pub capabilities: Vec<Capability>,
}

impl CapabilityProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            name: name.into(),
            capabilities,
        }
    }

    /// Profile used for every MegaD actuator: a light with on/off only.
    #[must_use]
    pub fn on_off_light() -> Self {
        Self::new("on_off_light", vec![Capability::OnOff])
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Command the host framework issues against an on/off device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOffCommand {
    On,
    Off,
}

impl OnOffCommand {
    /// The state the device should end up in.
    #[must_use]
    pub fn desired_state(self) -> bool {
        matches!(self, Self::On)
    }
}
