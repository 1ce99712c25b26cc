//! Topic codec — pure mapping between MQTT topic/payload strings and
//! `(DeviceId, bool)` tuples.
//!
//! State reports arrive on `alex/<deviceId>`; commands leave on the single
//! shared topic `alex/cmd` with payload `<deviceId>:<0|1>`. The two
//! namespaces are disjoint, so a command never decodes as a state report.

use crate::id::DeviceId;

/// Fixed namespace prefix for every topic.
pub const NAMESPACE: &str = "alex";

/// Shared outbound command topic.
pub const COMMAND_TOPIC: &str = "alex/cmd";

/// Inbound state topic for a device.
#[must_use]
pub fn state_topic(device_id: DeviceId) -> String {
    format!("{NAMESPACE}/{device_id}")
}

/// Decode an inbound state report.
///
/// Returns `None` unless the topic is exactly `alex/<integer>`. The payload
/// is `true` only when it trims to `"1"`; anything else is `false`.
#[must_use]
pub fn decode_inbound(topic: &str, payload: &str) -> Option<(DeviceId, bool)> {
    let mut segments = topic.split('/');
    let namespace = segments.next()?;
    let id = segments.next()?;
    if namespace != NAMESPACE || segments.next().is_some() {
        return None;
    }
    let device_id = id.parse().ok()?;
    Some((device_id, payload.trim() == "1"))
}

/// Encode an outbound command as `(topic, payload)`.
#[must_use]
pub fn encode_outbound(device_id: DeviceId, state: bool) -> (String, String) {
    let flag = if state { '1' } else { '0' };
    (COMMAND_TOPIC.to_string(), format!("{device_id}:{flag}"))
}
