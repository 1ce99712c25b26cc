//! Synchronization core — the per-device `Unknown → Synced(bool)` state machine.
//!
//! - **Inbound**: transport message → topic codec → device lookup →
//!   registry write → `Synced(state)`. Every decoded report is written, even
//!   when it matches the recorded state, so the registry always ends up with
//!   what the hardware last said.
//! - **Outbound**: host command → topic codec → publish → `Synced(desired)`
//!   without waiting for the broker or the state topic to echo back.
//!
//! Nothing here retries, queues, or propagates errors: every failure in the
//! data path is logged and the message or command is dropped.

use std::collections::{BTreeMap, BTreeSet};

use megabridge_domain::command::Command;
use megabridge_domain::device::{DeviceRecord, SyncState};
use megabridge_domain::error::BridgeError;
use megabridge_domain::id::DeviceId;
use megabridge_domain::topic;

use crate::ports::{DeviceRegistry, MqttClient, TransportEvent};
use crate::services::registry_facade::RegistryFacade;
use crate::session::MqttSession;

/// Owns every [`DeviceRecord`] and the optional MQTT session.
///
/// `session` is `None` in degraded mode (no broker configured) and after
/// shutdown. `configured` is the operator's device list; state topics are
/// subscribed from it whether or not the registry produced a record.
pub struct SyncCore<R, C> {
    facade: RegistryFacade<R>,
    session: Option<MqttSession<C>>,
    configured: BTreeSet<DeviceId>,
    records: BTreeMap<DeviceId, DeviceRecord>,
}

impl<R: DeviceRegistry, C: MqttClient> SyncCore<R, C> {
    pub fn new(
        facade: RegistryFacade<R>,
        configured: impl IntoIterator<Item = DeviceId>,
    ) -> Self {
        Self {
            facade,
            session: None,
            configured: configured.into_iter().collect(),
            records: BTreeMap::new(),
        }
    }

    pub fn facade(&self) -> &RegistryFacade<R> {
        &self.facade
    }

    pub fn session(&self) -> Option<&MqttSession<C>> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn record(&self, device_id: DeviceId) -> Option<&DeviceRecord> {
        self.records.get(&device_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.values()
    }

    pub fn insert_record(&mut self, record: DeviceRecord) {
        self.records.insert(record.device_id, record);
    }

    pub fn clear_records(&mut self) {
        self.records.clear();
    }

    pub fn attach_session(&mut self, session: MqttSession<C>) {
        self.session = Some(session);
    }

    /// End the session if there is one. Returns whether a session was ended.
    ///
    /// # Errors
    ///
    /// Propagates the client's disconnect error. The session is dropped
    /// either way.
    pub async fn end_session(&mut self) -> Result<bool, BridgeError> {
        match self.session.take() {
            Some(session) => {
                session.end().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Seed `Unknown` records from the on/off value the registry persisted.
    pub async fn seed_from_registry(&mut self) {
        for record in self.records.values_mut() {
            if record.state != SyncState::Unknown {
                continue;
            }
            match self.facade.read_state(record).await {
                Ok(Some(state)) => {
                    record.mark_synced(state);
                    tracing::debug!(device_id = %record.device_id, state, "seeded from registry");
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%err, device_id = %record.device_id, "failed to read persisted state");
                }
            }
        }
    }

    /// Dispatch a transport event.
    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected().await,
            TransportEvent::Error(detail) => self.on_transport_error(&detail),
            TransportEvent::Message { topic, payload } => {
                self.handle_message(&topic, &payload).await;
            }
        }
    }

    /// Mark the session as down without an explicit error event.
    pub fn mark_disconnected(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.mark_disconnected();
        }
    }

    async fn on_connected(&mut self) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("connected event without a session, ignored");
            return;
        };
        session.mark_connected();
        tracing::info!("MQTT broker connected");

        for device_id in &self.configured {
            if !self.records.contains_key(device_id) {
                tracing::warn!(
                    %device_id,
                    "configured device has no registry record, its reports will be dropped"
                );
            }
            let state_topic = topic::state_topic(*device_id);
            match session.subscribe(&state_topic).await {
                Ok(()) => tracing::debug!(topic = %state_topic, "subscribed"),
                Err(err) => tracing::warn!(%err, topic = %state_topic, "subscribe failed"),
            }
        }
    }

    fn on_transport_error(&mut self, detail: &str) {
        tracing::warn!(%detail, "MQTT transport error");
        self.mark_disconnected();
    }

    /// Inbound path: apply a state report to its device.
    #[tracing::instrument(skip(self))]
    pub async fn handle_message(&mut self, topic: &str, payload: &str) {
        let Some((device_id, state)) = topic::decode_inbound(topic, payload) else {
            tracing::debug!("message does not match the state topic shape, dropped");
            return;
        };

        let Some(record) = self.records.get_mut(&device_id) else {
            tracing::warn!(%device_id, "state report for unknown device, dropped");
            return;
        };

        match self.facade.apply_state(record, state).await {
            Ok(true) => {
                if record.mark_synced(state) {
                    tracing::info!(%device_id, state, "state applied from MQTT");
                } else {
                    tracing::debug!(%device_id, state, "state reaffirmed from MQTT");
                }
            }
            Ok(false) => {}
            Err(err) => tracing::warn!(%err, %device_id, "failed to apply state"),
        }
    }

    /// Outbound path: publish a command and optimistically assume it worked.
    #[tracing::instrument(skip(self))]
    pub async fn handle_command(&mut self, command: Command) {
        let device_id = command.device_id;
        let Some(record) = self.records.get_mut(&device_id) else {
            tracing::warn!(%device_id, "command for unknown device, dropped");
            return;
        };

        let Some(session) = self.session.as_ref() else {
            tracing::warn!(%device_id, "MQTT not connected, command dropped");
            return;
        };

        let (topic, payload) = topic::encode_outbound(device_id, command.desired_state);
        match session.publish(&topic, &payload).await {
            Ok(()) => {
                record.mark_synced(command.desired_state);
                tracing::info!(%device_id, state = command.desired_state, "command published");
            }
            Err(err) => tracing::warn!(%err, %device_id, "publish failed, command dropped"),
        }
    }
}
