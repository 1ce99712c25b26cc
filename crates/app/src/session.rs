//! The live MQTT session.
//!
//! At most one session exists per bridge instance. It is written only by the
//! lifecycle controller (attach on connect, end on shutdown) and read by the
//! sync core when publishing.

use std::collections::BTreeSet;

use megabridge_domain::error::BridgeError;

use crate::ports::MqttClient;

/// Connection handle plus what the bridge knows about its state.
#[derive(Debug)]
pub struct MqttSession<C> {
    client: C,
    connected: bool,
    subscribed_topics: BTreeSet<String>,
}

impl<C: MqttClient> MqttSession<C> {
    /// Wrap a freshly opened client. Not connected until the broker says so.
    pub fn new(client: C) -> Self {
        Self {
            client,
            connected: false,
            subscribed_topics: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn subscribed_topics(&self) -> &BTreeSet<String> {
        &self.subscribed_topics
    }

    pub fn mark_connected(&mut self) {
        self.connected = true;
    }

    /// The broker forgets subscriptions of a dropped clean session.
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.subscribed_topics.clear();
    }

    /// Subscribe and remember the topic.
    ///
    /// # Errors
    ///
    /// Propagates the client error; the topic is not recorded.
    pub async fn subscribe(&mut self, topic: &str) -> Result<(), BridgeError> {
        self.client.subscribe(topic).await?;
        self.subscribed_topics.insert(topic.to_owned());
        Ok(())
    }

    /// Publish if the broker connection is up.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] while disconnected, or the
    /// client error. Nothing is queued for later delivery.
    pub async fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError> {
        if !self.connected {
            return Err(BridgeError::NotConnected);
        }
        self.client.publish(topic, payload).await
    }

    /// Disconnect and consume the session.
    ///
    /// # Errors
    ///
    /// Propagates the client's disconnect error.
    pub async fn end(mut self) -> Result<(), BridgeError> {
        self.connected = false;
        self.client.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeClient;

    #[tokio::test]
    async fn should_start_disconnected() {
        let session = MqttSession::new(FakeClient::default());
        assert!(!session.is_connected());
        assert!(session.subscribed_topics().is_empty());
    }

    #[tokio::test]
    async fn should_refuse_publish_while_disconnected() {
        let client = FakeClient::default();
        let log = client.log();
        let session = MqttSession::new(client);

        let result = session.publish("alex/cmd", "11:1").await;

        assert!(matches!(result, Err(BridgeError::NotConnected)));
        assert!(log.published().is_empty());
    }

    #[tokio::test]
    async fn should_publish_once_connected() {
        let client = FakeClient::default();
        let log = client.log();
        let mut session = MqttSession::new(client);
        session.mark_connected();

        session.publish("alex/cmd", "11:1").await.unwrap();

        assert_eq!(
            log.published(),
            vec![("alex/cmd".to_string(), "11:1".to_string())]
        );
    }

    #[tokio::test]
    async fn should_record_subscriptions_and_forget_them_on_disconnect() {
        let mut session = MqttSession::new(FakeClient::default());
        session.mark_connected();
        session.subscribe("alex/11").await.unwrap();
        assert!(session.subscribed_topics().contains("alex/11"));

        session.mark_disconnected();
        assert!(session.subscribed_topics().is_empty());
    }

    #[tokio::test]
    async fn should_disconnect_client_when_ended() {
        let client = FakeClient::default();
        let log = client.log();
        let session = MqttSession::new(client);

        session.end().await.unwrap();

        assert_eq!(log.disconnects(), 1);
    }
}
