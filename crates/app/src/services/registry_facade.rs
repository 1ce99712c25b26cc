//! Registry facade — translates between the registry's capability-oriented
//! device objects and megabridge's `(DeviceId, bool)` vocabulary.
//!
//! The facade never interprets *why* a command arrived. Its command callbacks
//! only turn a host invocation into a [`Command`] on the core's channel.

use tokio::sync::mpsc;

use megabridge_domain::attribute::AttributeValue;
use megabridge_domain::capability::{Capability, CapabilityProfile, ON_OFF_ATTRIBUTE};
use megabridge_domain::command::Command;
use megabridge_domain::device::{DeviceConfig, DeviceRecord, unique_id_for};
use megabridge_domain::error::BridgeError;
use megabridge_domain::id::DeviceId;

use crate::ports::{CommandHandlers, DeviceRegistry};

/// On/off view over a [`DeviceRegistry`].
pub struct RegistryFacade<R> {
    registry: R,
    commands: mpsc::UnboundedSender<Command>,
}

impl<R: DeviceRegistry> RegistryFacade<R> {
    /// Create a facade whose command callbacks feed `commands`.
    pub fn new(registry: R, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { registry, commands }
    }

    /// Access the wrapped registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Materialize a device and attach its `turn_on` / `turn_off` callbacks.
    ///
    /// A device already present in the registry (persisted by an earlier run)
    /// is reused rather than duplicated.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    #[tracing::instrument(skip(self, config), fields(device_id = %config.id))]
    pub async fn create_device(&self, config: &DeviceConfig) -> Result<DeviceRecord, BridgeError> {
        let handle = match self.find_by_device_id(config.id).await? {
            Some(existing) => {
                tracing::debug!(handle = %existing.registry_handle, "reusing registry device");
                existing.registry_handle
            }
            None => {
                self.registry
                    .create(CapabilityProfile::on_off_light(), config.descriptor())
                    .await?
            }
        };

        self.registry
            .attach_command_handlers(handle, self.handlers_for(config.id))
            .await?;

        tracing::info!(name = %config.name, "device materialized");
        Ok(DeviceRecord::new(config, handle))
    }

    /// Look a device up by its MegaD id.
    ///
    /// The returned record starts in `Unknown`; sync state lives in the core.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    pub async fn find_by_device_id(
        &self,
        device_id: DeviceId,
    ) -> Result<Option<DeviceRecord>, BridgeError> {
        let unique_id = unique_id_for(device_id);
        let found = self
            .registry
            .find(move |descriptor| descriptor.unique_id == unique_id)
            .await?;

        Ok(found.map(|device| {
            let config = DeviceConfig {
                id: device_id,
                name: device.descriptor.name,
                room: device.descriptor.room,
            };
            DeviceRecord::new(&config, device.handle)
        }))
    }

    /// Write the on/off attribute.
    ///
    /// Returns `Ok(false)` without writing when the device lacks the on/off
    /// capability.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    pub async fn apply_state(&self, record: &DeviceRecord, state: bool) -> Result<bool, BridgeError> {
        let handle = record.registry_handle;
        if !self
            .registry
            .has_capability(handle, Capability::OnOff)
            .await?
        {
            tracing::warn!(
                device_id = %record.device_id,
                %handle,
                "registry device has no on/off capability, state not written"
            );
            return Ok(false);
        }

        self.registry
            .write_attribute(handle, ON_OFF_ATTRIBUTE, AttributeValue::from(state))
            .await?;
        Ok(true)
    }

    /// Read the on/off attribute the registry persisted, if any.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    pub async fn read_state(&self, record: &DeviceRecord) -> Result<Option<bool>, BridgeError> {
        let value = self
            .registry
            .read_attribute(record.registry_handle, ON_OFF_ATTRIBUTE)
            .await?;
        Ok(value.and_then(AttributeValue::as_bool))
    }

    /// Withdraw every device from the host.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    pub async fn remove_all(&self) -> Result<(), BridgeError> {
        self.registry.deregister_all().await?;
        tracing::info!("all devices deregistered");
        Ok(())
    }

    fn handlers_for(&self, device_id: DeviceId) -> CommandHandlers {
        let on = self.commands.clone();
        let off = self.commands.clone();
        CommandHandlers::new(
            move || forward(&on, Command::new(device_id, true)),
            move || forward(&off, Command::new(device_id, false)),
        )
    }
}

fn forward(commands: &mpsc::UnboundedSender<Command>, command: Command) {
    if commands.send(command).is_err() {
        tracing::warn!(
            device_id = %command.device_id,
            "bridge is not running, command dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use megabridge_domain::capability::OnOffCommand;
    use megabridge_domain::device::DeviceDescriptor;

    use crate::test_support::FakeRegistry;

    fn facade() -> (
        RegistryFacade<FakeRegistry>,
        FakeRegistry,
        mpsc::UnboundedReceiver<Command>,
    ) {
        let registry = FakeRegistry::default();
        let (tx, rx) = mpsc::unbounded_channel();
        (RegistryFacade::new(registry.clone(), tx), registry, rx)
    }

    fn bedroom() -> DeviceConfig {
        DeviceConfig::new(DeviceId::new(11), "Bedroom Light")
    }

    #[tokio::test]
    async fn should_create_device_in_registry() {
        let (facade, registry, _rx) = facade();

        let record = facade.create_device(&bedroom()).await.unwrap();

        assert_eq!(record.device_id, DeviceId::new(11));
        assert_eq!(record.display_name, "Bedroom Light");
        assert_eq!(registry.device_count(), 1);
        assert_eq!(registry.calls(), vec!["create"]);
    }

    #[tokio::test]
    async fn should_reuse_existing_registry_device() {
        let (facade, registry, _rx) = facade();
        let existing = registry.with_device(
            CapabilityProfile::on_off_light(),
            bedroom().descriptor(),
            Vec::new(),
        );

        let record = facade.create_device(&bedroom()).await.unwrap();

        assert_eq!(record.registry_handle, existing);
        assert_eq!(registry.device_count(), 1);
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn should_forward_host_commands_to_channel() {
        let (facade, registry, mut rx) = facade();
        facade.create_device(&bedroom()).await.unwrap();

        registry.press("megad-11", OnOffCommand::On);
        registry.press("megad-11", OnOffCommand::Off);

        assert_eq!(rx.recv().await, Some(Command::new(DeviceId::new(11), true)));
        assert_eq!(rx.recv().await, Some(Command::new(DeviceId::new(11), false)));
    }

    #[tokio::test]
    async fn should_not_panic_when_command_channel_is_closed() {
        let (facade, registry, rx) = facade();
        facade.create_device(&bedroom()).await.unwrap();
        drop(rx);

        registry.press("megad-11", OnOffCommand::On);
    }

    #[tokio::test]
    async fn should_find_device_by_id() {
        let (facade, _registry, _rx) = facade();
        facade
            .create_device(&bedroom().with_room("Upstairs"))
            .await
            .unwrap();

        let found = facade
            .find_by_device_id(DeviceId::new(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.room.as_deref(), Some("Upstairs"));
        assert!(
            facade
                .find_by_device_id(DeviceId::new(12))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn should_write_on_off_attribute() {
        let (facade, registry, _rx) = facade();
        let record = facade.create_device(&bedroom()).await.unwrap();

        assert!(facade.apply_state(&record, true).await.unwrap());

        assert_eq!(
            registry.writes(),
            vec![(
                record.registry_handle,
                ON_OFF_ATTRIBUTE.to_string(),
                AttributeValue::Bool(true)
            )]
        );
        assert_eq!(facade.read_state(&record).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn should_skip_write_without_on_off_capability() {
        let (facade, registry, _rx) = facade();
        registry.with_device(
            CapabilityProfile::new("bare", Vec::new()),
            DeviceDescriptor {
                unique_id: "megad-11".to_string(),
                name: "Bedroom Light".to_string(),
                room: None,
            },
            Vec::new(),
        );
        let record = facade.create_device(&bedroom()).await.unwrap();

        assert!(!facade.apply_state(&record, true).await.unwrap());
        assert!(registry.writes().is_empty());
    }

    #[tokio::test]
    async fn should_read_nothing_before_first_write() {
        let (facade, _registry, _rx) = facade();
        let record = facade.create_device(&bedroom()).await.unwrap();
        assert_eq!(facade.read_state(&record).await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_deregister_everything_on_remove_all() {
        let (facade, registry, _rx) = facade();
        facade.remove_all().await.unwrap();
        assert_eq!(registry.calls(), vec!["deregister_all"]);
    }
}
