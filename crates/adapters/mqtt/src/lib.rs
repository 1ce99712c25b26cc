//! # megabridge-adapter-mqtt
//!
//! MQTT transport adapter — connects megabridge to a broker through
//! [`rumqttc`].
//!
//! ## How it works
//!
//! [`RumqttcConnector::connect`] builds an [`rumqttc::AsyncClient`] and
//! spawns a task that polls its event loop, translating broker traffic into
//! [`TransportEvent`]s:
//!
//! | rumqttc event | Transport event |
//! |---------------|-----------------|
//! | `ConnAck` (success) | `Connected` |
//! | `ConnAck` (refused) | `Error` |
//! | `Publish` | `Message` (payload decoded lossily as UTF-8) |
//! | poll error | `Error`, then retry after `reconnect_delay_secs` |
//!
//! All subscriptions and publishes use QoS 0 without the retain flag.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `megabridge-app` and `megabridge-domain`.

mod config;
mod error;
mod event_loop;

pub use config::{BrokerEndpoint, MqttConfig};
pub use error::MqttError;

use std::time::Duration;

use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use megabridge_app::ports::{Connection, MqttClient, MqttConnector, TransportEvent};
use megabridge_domain::error::BridgeError;

/// How long `disconnect` waits for the event loop to flush the DISCONNECT
/// packet before aborting it.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// [`MqttConnector`] backed by rumqttc.
#[derive(Debug, Clone)]
pub struct RumqttcConnector {
    config: MqttConfig,
}

impl RumqttcConnector {
    /// Create a connector from configuration.
    ///
    /// Returns `None` when no broker is configured, which leaves the bridge
    /// in degraded mode.
    #[must_use]
    pub fn from_config(config: MqttConfig) -> Option<Self> {
        config.is_configured().then_some(Self { config })
    }

    fn options(&self, endpoint: BrokerEndpoint) -> MqttOptions {
        let mut options = MqttOptions::new(&self.config.client_id, endpoint.host, endpoint.port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));
        if let Some(username) = &self.config.username {
            options.set_credentials(username, self.config.password.clone().unwrap_or_default());
        }
        options
    }
}

impl MqttConnector for RumqttcConnector {
    type Client = RumqttcClient;

    #[tracing::instrument(skip(self))]
    async fn connect(&self) -> Result<Connection<RumqttcClient>, BridgeError> {
        let endpoint = self.config.endpoint()?;
        tracing::info!(host = %endpoint.host, port = endpoint.port, "connecting to MQTT broker");

        let capacity = self.config.channel_capacity.max(1);
        let (client, eventloop) = AsyncClient::new(self.options(endpoint), capacity);
        let (tx, rx) = mpsc::channel::<TransportEvent>(capacity);
        let reconnect_delay = Duration::from_secs(u64::from(self.config.reconnect_delay_secs));
        let task = tokio::spawn(event_loop::run(eventloop, tx, reconnect_delay));

        Ok(Connection {
            client: RumqttcClient {
                client,
                task: Some(task),
            },
            events: rx,
        })
    }
}

/// [`MqttClient`] backed by a rumqttc [`AsyncClient`].
pub struct RumqttcClient {
    client: AsyncClient,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for RumqttcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RumqttcClient")
            .field("running", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl MqttClient for RumqttcClient {
    async fn subscribe(&self, topic: &str) -> Result<(), BridgeError> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(MqttError::Client)?;
        tracing::debug!(topic, "MQTT subscribe requested");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(MqttError::Client)?;
        tracing::debug!(topic, payload, "MQTT publish requested");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BridgeError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        if let Err(err) = self.client.disconnect().await {
            tracing::debug!(error = %err, "MQTT disconnect request not delivered");
        }
        if tokio::time::timeout(DISCONNECT_GRACE, &mut task).await.is_err() {
            task.abort();
            // A cancelled join is the expected outcome here.
            let _ = task.await;
        }
        tracing::info!("MQTT client disconnected");
        Ok(())
    }
}
