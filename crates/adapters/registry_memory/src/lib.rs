//! # megabridge-adapter-registry-memory
//!
//! In-process device registry. It stands in for the host device framework:
//! devices live in a mutex-guarded list, attributes are kept per device, and
//! [`InMemoryRegistry::invoke`] plays the part of a user or automation
//! issuing an on/off command.
//!
//! Clones share the same storage. Handing a clone to each of two bridge runs
//! behaves like a restart against a persistent host: devices and their last
//! attributes survive.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `megabridge-app` and `megabridge-domain`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use megabridge_app::ports::{CommandHandlers, DeviceRegistry, RegisteredDevice};
use megabridge_domain::attribute::AttributeValue;
use megabridge_domain::capability::{Capability, CapabilityProfile, ON_OFF_ATTRIBUTE, OnOffCommand};
use megabridge_domain::device::DeviceDescriptor;
use megabridge_domain::error::{BridgeError, NotFoundError};
use megabridge_domain::id::RegistryHandle;

struct StoredDevice {
    handle: RegistryHandle,
    profile: CapabilityProfile,
    descriptor: DeviceDescriptor,
    attributes: BTreeMap<String, AttributeValue>,
    handlers: Option<CommandHandlers>,
}

impl StoredDevice {
    fn registered(&self) -> RegisteredDevice {
        RegisteredDevice {
            handle: self.handle,
            descriptor: self.descriptor.clone(),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    devices: Vec<StoredDevice>,
    registered: bool,
    shut_down: bool,
}

impl RegistryState {
    fn device(&self, handle: RegistryHandle) -> Result<&StoredDevice, BridgeError> {
        self.devices
            .iter()
            .find(|device| device.handle == handle)
            .ok_or_else(|| not_found(handle))
    }

    fn device_mut(&mut self, handle: RegistryHandle) -> Result<&mut StoredDevice, BridgeError> {
        self.devices
            .iter_mut()
            .find(|device| device.handle == handle)
            .ok_or_else(|| not_found(handle))
    }
}

fn not_found(handle: RegistryHandle) -> BridgeError {
    NotFoundError {
        entity: "Device",
        id: handle.to_string(),
    }
    .into()
}

/// A device registry held entirely in memory.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryRegistry")
            .field("devices", &state.devices.len())
            .field("registered", &state.registered)
            .finish_non_exhaustive()
    }
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue an on/off command against a device, as the host would.
    ///
    /// The host reflects the commanded state in the device's attribute before
    /// notifying the attached handlers.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] for an unknown handle and
    /// [`BridgeError::CapabilityMismatch`] when the device is not on/off.
    pub fn invoke(&self, handle: RegistryHandle, command: OnOffCommand) -> Result<(), BridgeError> {
        let handlers = {
            let mut state = self.lock();
            let device = state.device_mut(handle)?;
            if !device.profile.supports(Capability::OnOff) {
                return Err(BridgeError::CapabilityMismatch {
                    handle,
                    capability: Capability::OnOff,
                });
            }
            device.attributes.insert(
                ON_OFF_ATTRIBUTE.to_string(),
                AttributeValue::from(command.desired_state()),
            );
            device.handlers.clone()
        };

        tracing::debug!(%handle, ?command, "host command issued");
        match handlers {
            Some(handlers) => handlers.invoke(command),
            None => tracing::warn!(%handle, "no command handlers attached"),
        }
        Ok(())
    }

    /// [`Self::invoke`] addressed by the device's unique id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::invoke`].
    pub fn invoke_unique(&self, unique_id: &str, command: OnOffCommand) -> Result<(), BridgeError> {
        let handle = self
            .lock()
            .devices
            .iter()
            .find(|device| device.descriptor.unique_id == unique_id)
            .map(|device| device.handle)
            .ok_or_else(|| {
                BridgeError::from(NotFoundError {
                    entity: "Device",
                    id: unique_id.to_string(),
                })
            })?;
        self.invoke(handle, command)
    }

    /// Every stored device.
    #[must_use]
    pub fn devices(&self) -> Vec<RegisteredDevice> {
        self.lock()
            .devices
            .iter()
            .map(StoredDevice::registered)
            .collect()
    }

    /// Current value of a device attribute, if set.
    #[must_use]
    pub fn attribute(&self, handle: RegistryHandle, name: &str) -> Option<AttributeValue> {
        let state = self.lock();
        state.device(handle).ok()?.attributes.get(name).copied()
    }

    /// Whether the devices are currently exposed to the host.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.lock().registered
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceRegistry for InMemoryRegistry {
    async fn wait_ready(&self) -> Result<(), BridgeError> {
        // A restarted bridge finds the registry usable again.
        self.lock().shut_down = false;
        Ok(())
    }

    async fn clear_selection(&self) -> Result<(), BridgeError> {
        // Nothing in process can select a device.
        Ok(())
    }

    async fn create(
        &self,
        profile: CapabilityProfile,
        descriptor: DeviceDescriptor,
    ) -> Result<RegistryHandle, BridgeError> {
        let handle = RegistryHandle::new();
        tracing::debug!(%handle, unique_id = %descriptor.unique_id, profile = %profile.name, "device created");
        self.lock().devices.push(StoredDevice {
            handle,
            profile,
            descriptor,
            attributes: BTreeMap::new(),
            handlers: None,
        });
        Ok(handle)
    }

    async fn attach_command_handlers(
        &self,
        handle: RegistryHandle,
        handlers: CommandHandlers,
    ) -> Result<(), BridgeError> {
        self.lock().device_mut(handle)?.handlers = Some(handlers);
        Ok(())
    }

    async fn find<P>(&self, predicate: P) -> Result<Option<RegisteredDevice>, BridgeError>
    where
        P: Fn(&DeviceDescriptor) -> bool + Send,
    {
        Ok(self
            .lock()
            .devices
            .iter()
            .find(|device| predicate(&device.descriptor))
            .map(StoredDevice::registered))
    }

    async fn has_capability(
        &self,
        handle: RegistryHandle,
        capability: Capability,
    ) -> Result<bool, BridgeError> {
        Ok(self.lock().device(handle)?.profile.supports(capability))
    }

    async fn read_attribute(
        &self,
        handle: RegistryHandle,
        name: &str,
    ) -> Result<Option<AttributeValue>, BridgeError> {
        Ok(self.lock().device(handle)?.attributes.get(name).copied())
    }

    async fn write_attribute(
        &self,
        handle: RegistryHandle,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), BridgeError> {
        let mut state = self.lock();
        let device = state.device_mut(handle)?;
        tracing::info!(name = %device.descriptor.name, attribute = name, ?value, "attribute updated");
        device.attributes.insert(name.to_string(), value);
        Ok(())
    }

    async fn register_all(&self) -> Result<(), BridgeError> {
        let mut state = self.lock();
        state.registered = true;
        tracing::info!(count = state.devices.len(), "devices registered with host");
        Ok(())
    }

    async fn deregister_all(&self) -> Result<(), BridgeError> {
        let mut state = self.lock();
        state.registered = false;
        for device in &mut state.devices {
            device.handlers = None;
        }
        tracing::info!("devices deregistered from host");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        self.lock().shut_down = true;
        Ok(())
    }
}
