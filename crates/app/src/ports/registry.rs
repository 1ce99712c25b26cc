//! Device registry port — the external device-abstraction framework.
//!
//! The registry owns device objects and their persistence. megabridge only
//! consumes it: create devices, find them again, read/write attributes and
//! (de)register them with the host.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use megabridge_domain::attribute::AttributeValue;
use megabridge_domain::capability::{Capability, CapabilityProfile, OnOffCommand};
use megabridge_domain::device::DeviceDescriptor;
use megabridge_domain::error::BridgeError;
use megabridge_domain::id::RegistryHandle;

type CommandCallback = Arc<dyn Fn() + Send + Sync>;

/// The two command callbacks attached to every on/off device.
///
/// The registry invokes them when a user or automation issues a command.
#[derive(Clone)]
pub struct CommandHandlers {
    turn_on: CommandCallback,
    turn_off: CommandCallback,
}

impl CommandHandlers {
    pub fn new(
        turn_on: impl Fn() + Send + Sync + 'static,
        turn_off: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            turn_on: Arc::new(turn_on),
            turn_off: Arc::new(turn_off),
        }
    }

    /// Run the callback matching `command`.
    pub fn invoke(&self, command: OnOffCommand) {
        match command {
            OnOffCommand::On => (self.turn_on)(),
            OnOffCommand::Off => (self.turn_off)(),
        }
    }
}

impl fmt::Debug for CommandHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandlers").finish_non_exhaustive()
    }
}

/// A device as returned by [`DeviceRegistry::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDevice {
    pub handle: RegistryHandle,
    pub descriptor: DeviceDescriptor,
}

/// The external device registry.
pub trait DeviceRegistry: Send + Sync {
    /// Resolve once the registry accepts device operations.
    fn wait_ready(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Drop any stale device selection left from a previous run.
    fn clear_selection(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Create a device with the given capability profile.
    fn create(
        &self,
        profile: CapabilityProfile,
        descriptor: DeviceDescriptor,
    ) -> impl Future<Output = Result<RegistryHandle, BridgeError>> + Send;

    /// Attach (or replace) the command callbacks of a device.
    fn attach_command_handlers(
        &self,
        handle: RegistryHandle,
        handlers: CommandHandlers,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Return the first device whose descriptor matches `predicate`.
    fn find<P>(
        &self,
        predicate: P,
    ) -> impl Future<Output = Result<Option<RegisteredDevice>, BridgeError>> + Send
    where
        P: Fn(&DeviceDescriptor) -> bool + Send;

    /// Whether the device exposes `capability`.
    fn has_capability(
        &self,
        handle: RegistryHandle,
        capability: Capability,
    ) -> impl Future<Output = Result<bool, BridgeError>> + Send;

    /// Read a named attribute. `Ok(None)` when never written.
    fn read_attribute(
        &self,
        handle: RegistryHandle,
        name: &str,
    ) -> impl Future<Output = Result<Option<AttributeValue>, BridgeError>> + Send;

    /// Write a named attribute.
    fn write_attribute(
        &self,
        handle: RegistryHandle,
        name: &str,
        value: AttributeValue,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Expose every created device to the host.
    fn register_all(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Withdraw every device from the host.
    fn deregister_all(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// The host framework's own shutdown hook.
    fn shutdown(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;
}
