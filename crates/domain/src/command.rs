//! Command — a transient request to drive a device to a state.

use crate::capability::OnOffCommand;
use crate::id::DeviceId;

/// Produced by a user/automation action, consumed immediately by the sync core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub device_id: DeviceId,
    pub desired_state: bool,
}

impl Command {
    #[must_use]
    pub fn new(device_id: DeviceId, desired_state: bool) -> Self {
        Self {
            device_id,
            desired_state,
        }
    }

    #[must_use]
    pub fn from_on_off(device_id: DeviceId, command: OnOffCommand) -> Self {
        Self::new(device_id, command.desired_state())
    }
}
