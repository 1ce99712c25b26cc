//! Devices — operator configuration and the runtime record tracked per device.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::id::{DeviceId, RegistryHandle};

/// Device id used when the configuration lists no devices at all.
pub const PLACEHOLDER_DEVICE_ID: DeviceId = DeviceId::new(11);

/// One configured MegaD actuator. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl DeviceConfig {
    #[must_use]
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            room: None,
        }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// The single device materialized when none are configured.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(
            PLACEHOLDER_DEVICE_ID,
            format!("MegaD {PLACEHOLDER_DEVICE_ID}"),
        )
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDeviceId`] or [`ConfigError::EmptyName`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.id.validate()?;
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName(self.id));
        }
        Ok(())
    }

    /// Stable identifier under which this device is stored in the registry.
    #[must_use]
    pub fn unique_id(&self) -> String {
        unique_id_for(self.id)
    }

    /// Descriptor handed to the registry when creating the device.
    #[must_use]
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            unique_id: self.unique_id(),
            name: self.name.clone(),
            room: self.room.clone(),
        }
    }
}

/// Registry unique id for a MegaD device id.
#[must_use]
pub fn unique_id_for(id: DeviceId) -> String {
    format!("megad-{id}")
}

/// Validate a whole device list: every entry valid, ids unique.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered.
pub fn validate_all(devices: &[DeviceConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::with_capacity(devices.len());
    for device in devices {
        device.validate()?;
        if !seen.insert(device.id) {
            return Err(ConfigError::DuplicateDeviceId(device.id));
        }
    }
    Ok(())
}

/// What the external registry knows about a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub unique_id: String,
    pub name: String,
    pub room: Option<String>,
}

/// Per-device synchronization state.
///
/// There is no pending state: transitions are applied optimistically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Unknown,
    Synced(bool),
}

impl SyncState {
    #[must_use]
    pub fn last_known_state(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Synced(state) => Some(state),
        }
    }
}

/// Runtime entity created from a [`DeviceConfig`], owned by the sync core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub display_name: String,
    pub room: Option<String>,
    pub registry_handle: RegistryHandle,
    pub state: SyncState,
}

impl DeviceRecord {
    #[must_use]
    pub fn new(config: &DeviceConfig, registry_handle: RegistryHandle) -> Self {
        Self {
            device_id: config.id,
            display_name: config.name.clone(),
            room: config.room.clone(),
            registry_handle,
            state: SyncState::Unknown,
        }
    }

    /// Transition to `Synced(state)`. Returns `true` when the value changed.
    pub fn mark_synced(&mut self, state: bool) -> bool {
        let next = SyncState::Synced(state);
        if self.state == next {
            return false;
        }
        self.state = next;
        true
    }

    #[must_use]
    pub fn last_known_state(&self) -> Option<bool> {
        self.state.last_known_state()
    }
}
