//! Lifecycle controller — drives startup and shutdown in order.
//!
//! ```text
//! Created → Starting → Ready → ShuttingDown → Stopped
//! ```
//!
//! Startup: wait for the registry → clear stale selection → connect to the
//! broker (if configured) → materialize every device → register them.
//! Shutdown: end the MQTT session → run the registry's own shutdown hook →
//! optionally deregister every device.
//!
//! Every step guards on what already happened, so calling shutdown twice,
//! or before startup finished, is harmless.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use megabridge_domain::command::Command;
use megabridge_domain::device::{self, DeviceConfig};
use megabridge_domain::error::BridgeError;

use crate::ports::{
    DeviceRegistry, LogLevelControl, MqttConnector, PlatformHooks, TransportEvent,
};
use crate::services::registry_facade::RegistryFacade;
use crate::session::MqttSession;
use crate::sync_core::SyncCore;

/// Phase of the bridge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Created,
    Starting,
    Ready,
    ShuttingDown,
    Stopped,
}

/// What the controller needs from configuration.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub devices: Vec<DeviceConfig>,
    pub unregister_on_shutdown: bool,
}

/// Owns the sync core, the transport event stream, and the command channel.
pub struct LifecycleController<R, M: MqttConnector> {
    settings: BridgeSettings,
    phase: LifecyclePhase,
    connector: Option<M>,
    core: SyncCore<R, M::Client>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    commands: mpsc::UnboundedReceiver<Command>,
    logger: Option<Arc<dyn LogLevelControl>>,
}

enum Step {
    Shutdown,
    Transport(Option<TransportEvent>),
    Command(Option<Command>),
}

impl<R, M> LifecycleController<R, M>
where
    R: DeviceRegistry,
    M: MqttConnector,
{
    /// Validate configuration and build an idle controller.
    ///
    /// `connector` is `None` when no broker is configured (degraded mode).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] for invalid or duplicate devices.
    pub fn new(
        settings: BridgeSettings,
        registry: R,
        connector: Option<M>,
    ) -> Result<Self, BridgeError> {
        device::validate_all(&settings.devices)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let configured: Vec<_> = settings.devices.iter().map(|config| config.id).collect();
        Ok(Self {
            settings,
            phase: LifecyclePhase::Created,
            connector,
            core: SyncCore::new(RegistryFacade::new(registry, tx), configured),
            events: None,
            commands: rx,
            logger: None,
        })
    }

    /// Route `on_change_logger_level` to a logging backend.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LogLevelControl>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn core(&self) -> &SyncCore<R, M::Client> {
        &self.core
    }

    /// Created → Starting → Ready.
    ///
    /// # Errors
    ///
    /// Only a malformed broker URL aborts startup. Registry and connectivity
    /// failures are logged and the bridge carries on degraded.
    #[tracing::instrument(skip(self))]
    pub async fn start(&mut self, reason: &str) -> Result<(), BridgeError> {
        if self.phase != LifecyclePhase::Created {
            tracing::debug!(phase = ?self.phase, "start ignored");
            return Ok(());
        }
        self.phase = LifecyclePhase::Starting;
        tracing::info!("bridge starting");

        let registry = self.core.facade().registry();
        if let Err(err) = registry.wait_ready().await {
            tracing::warn!(%err, "device registry did not report ready");
        }
        if let Err(err) = registry.clear_selection().await {
            tracing::warn!(%err, "failed to clear stale selection");
        }

        self.connect().await?;
        self.materialize().await;

        if self.phase != LifecyclePhase::Starting {
            return Ok(());
        }
        if let Err(err) = self.core.facade().registry().register_all().await {
            tracing::warn!(%err, "failed to register devices with the host");
        }
        self.phase = LifecyclePhase::Ready;
        tracing::info!(devices = self.core.records().count(), "bridge ready");
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), BridgeError> {
        let Some(connector) = self.connector.as_ref() else {
            tracing::warn!("no MQTT broker configured, running in degraded mode");
            return Ok(());
        };

        match connector.connect().await {
            Ok(connection) => {
                self.core.attach_session(MqttSession::new(connection.client));
                self.events = Some(connection.events);
                Ok(())
            }
            Err(BridgeError::Config(err)) => {
                self.phase = LifecyclePhase::Stopped;
                Err(err.into())
            }
            Err(err) => {
                tracing::warn!(%err, "MQTT connect failed, devices will not be controllable");
                Ok(())
            }
        }
    }

    async fn materialize(&mut self) {
        for config in &self.settings.devices {
            if self.phase != LifecyclePhase::Starting {
                tracing::debug!("materialization interrupted");
                return;
            }
            match self.core.facade().create_device(config).await {
                Ok(record) => self.core.insert_record(record),
                Err(err) => tracing::warn!(%err, device_id = %config.id, "failed to create device"),
            }
        }
    }

    /// Seed sync state from what the registry persisted.
    pub async fn configure(&mut self) {
        if self.phase != LifecyclePhase::Ready {
            tracing::debug!(phase = ?self.phase, "configure ignored");
            return;
        }
        self.core.seed_from_registry().await;
        for record in self.core.records() {
            tracing::info!(
                device_id = %record.device_id,
                name = %record.display_name,
                state = ?record.state,
                "device configured"
            );
        }
    }

    /// Handle transport events and host commands until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.phase != LifecyclePhase::Ready {
            tracing::warn!(phase = ?self.phase, "event loop not started");
            return;
        }
        tokio::pin!(shutdown);

        loop {
            let step = tokio::select! {
                () = &mut shutdown => Step::Shutdown,
                event = next_event(&mut self.events) => Step::Transport(event),
                command = self.commands.recv() => Step::Command(command),
            };

            match step {
                Step::Shutdown => return,
                Step::Transport(Some(event)) => self.core.handle_transport_event(event).await,
                Step::Transport(None) => {
                    tracing::warn!("MQTT event stream closed");
                    self.events = None;
                    self.core.mark_disconnected();
                }
                Step::Command(Some(command)) => self.core.handle_command(command).await,
                // The facade keeps a sender alive for as long as the core exists.
                Step::Command(None) => return,
            }
        }
    }

    /// Handle everything already queued without waiting for more.
    pub async fn process_pending(&mut self) {
        loop {
            let event = self.events.as_mut().and_then(|rx| rx.try_recv().ok());
            let had_event = event.is_some();
            if let Some(event) = event {
                self.core.handle_transport_event(event).await;
            }

            let command = self.commands.try_recv().ok();
            let had_command = command.is_some();
            if let Some(command) = command {
                self.core.handle_command(command).await;
            }

            if !had_event && !had_command {
                return;
            }
        }
    }

    /// Ready → ShuttingDown → Stopped. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&mut self, reason: &str) {
        match self.phase {
            LifecyclePhase::ShuttingDown | LifecyclePhase::Stopped => {
                tracing::debug!(phase = ?self.phase, "already shut down");
                return;
            }
            LifecyclePhase::Created => {
                self.phase = LifecyclePhase::Stopped;
                return;
            }
            LifecyclePhase::Starting | LifecyclePhase::Ready => {}
        }
        self.phase = LifecyclePhase::ShuttingDown;
        tracing::info!("bridge shutting down");

        self.events = None;
        match self.core.end_session().await {
            Ok(true) => tracing::info!("MQTT session ended"),
            Ok(false) => tracing::debug!("no MQTT session to end"),
            Err(err) => tracing::warn!(%err, "MQTT disconnect failed"),
        }

        if let Err(err) = self.core.facade().registry().shutdown().await {
            tracing::warn!(%err, "device registry shutdown failed");
        }

        if self.settings.unregister_on_shutdown {
            if let Err(err) = self.core.facade().remove_all().await {
                tracing::warn!(%err, "failed to deregister devices");
            }
        }

        self.core.clear_records();
        self.phase = LifecyclePhase::Stopped;
        tracing::info!("bridge stopped");
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<TransportEvent>>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl<R, M> PlatformHooks for LifecycleController<R, M>
where
    R: DeviceRegistry,
    M: MqttConnector,
{
    async fn on_start(&mut self, reason: &str) -> Result<(), BridgeError> {
        self.start(reason).await
    }

    async fn on_configure(&mut self) -> Result<(), BridgeError> {
        self.configure().await;
        Ok(())
    }

    async fn on_shutdown(&mut self, reason: &str) -> Result<(), BridgeError> {
        self.shutdown(reason).await;
        Ok(())
    }

    fn on_change_logger_level(&mut self, level: tracing::Level) -> Result<(), BridgeError> {
        match self.logger.as_ref() {
            Some(logger) => {
                logger.set_level(level)?;
                tracing::info!(%level, "log level changed");
            }
            None => tracing::debug!(%level, "no logging backend attached"),
        }
        Ok(())
    }
}
