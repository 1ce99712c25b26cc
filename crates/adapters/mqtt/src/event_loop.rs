//! Background task driving the rumqttc event loop.

use std::time::Duration;

use rumqttc::{ConnectReturnCode, Event, EventLoop, Outgoing, Packet};
use tokio::sync::mpsc;

use megabridge_app::ports::TransportEvent;

/// What the poll loop should do with a rumqttc event.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Translated {
    Forward(TransportEvent),
    Ignore,
    Stop,
}

/// Map a single rumqttc event onto the transport vocabulary.
pub(crate) fn translate(event: Event) -> Translated {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => {
            if ack.code == ConnectReturnCode::Success {
                Translated::Forward(TransportEvent::Connected)
            } else {
                Translated::Forward(TransportEvent::Error(format!(
                    "connection refused: {:?}",
                    ack.code
                )))
            }
        }
        Event::Incoming(Packet::Publish(publish)) => Translated::Forward(TransportEvent::Message {
            topic: publish.topic,
            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
        }),
        Event::Outgoing(Outgoing::Disconnect) => Translated::Stop,
        _ => Translated::Ignore,
    }
}

/// Poll `eventloop` until the client disconnects or the receiver goes away.
///
/// rumqttc reconnects on the next poll after an error; `reconnect_delay`
/// paces those attempts.
pub(crate) async fn run(
    mut eventloop: EventLoop,
    events: mpsc::Sender<TransportEvent>,
    reconnect_delay: Duration,
) {
    loop {
        let forwarded = match eventloop.poll().await {
            Ok(event) => match translate(event) {
                Translated::Forward(event) => event,
                Translated::Ignore => continue,
                Translated::Stop => {
                    tracing::debug!("MQTT disconnect sent, event loop stopping");
                    return;
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "MQTT connection error");
                if events
                    .send(TransportEvent::Error(err.to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        };

        if events.send(forwarded).await.is_err() {
            tracing::debug!("transport event receiver dropped, event loop stopping");
            return;
        }
    }
}
