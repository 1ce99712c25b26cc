//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the synchronization core and the outside
//! world: the MQTT broker, the external device registry, the logging backend
//! and the host framework's lifecycle hooks.

pub mod mqtt;
pub mod platform;
pub mod registry;

pub use mqtt::{Connection, MqttClient, MqttConnector, TransportEvent};
pub use platform::{LogLevelControl, PlatformHooks};
pub use registry::{CommandHandlers, DeviceRegistry, RegisteredDevice};
