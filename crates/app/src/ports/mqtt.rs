//! MQTT transport port.
//!
//! Reconnection and backoff belong to the concrete transport. The port only
//! surfaces raw connectivity events; the lifecycle controller decides what to
//! do about them.

use std::future::Future;

use tokio::sync::mpsc;

use megabridge_domain::error::BridgeError;

/// Events emitted by a live transport towards the sync core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the connection (also emitted after a reconnect).
    Connected,
    /// The connection failed or dropped.
    Error(String),
    /// A message arrived on a subscribed topic.
    Message { topic: String, payload: String },
}

/// Handle to a connected broker client.
pub trait MqttClient: Send + Sync {
    /// Subscribe to a topic.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Publish a UTF-8 payload on a topic.
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// End the session.
    ///
    /// Once the returned future resolves, no further [`TransportEvent`] is
    /// delivered. Disconnecting twice is a no-op.
    fn disconnect(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

/// A freshly opened connection: the client plus its event stream.
#[derive(Debug)]
pub struct Connection<C> {
    pub client: C,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens connections to a configured broker.
///
/// Only constructed when a broker is configured; its absence is what puts the
/// bridge in degraded mode.
pub trait MqttConnector: Send + Sync {
    type Client: MqttClient;

    /// Open a connection.
    ///
    /// Returns [`BridgeError::Config`] when the broker URL is malformed.
    /// Reachability is reported later through [`TransportEvent`]s.
    fn connect(&self) -> impl Future<Output = Result<Connection<Self::Client>, BridgeError>> + Send;
}
