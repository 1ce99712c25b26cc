//! # megabridge-app
//!
//! Application layer — **port definitions** (traits) and the services that
//! keep MQTT and the device registry in sync.
//!
//! ## Responsibilities
//! - Define **driven ports** that adapters implement:
//!   - `MqttConnector` / `MqttClient` — broker connection, subscribe, publish
//!   - `DeviceRegistry` — the external device-abstraction framework
//!   - `LogLevelControl` — runtime log level changes
//! - Define the **driving port** `PlatformHooks` invoked by the host framework
//! - Provide the services:
//!   - `MqttSession` — the single live broker session
//!   - `RegistryFacade` — on/off view over the capability-oriented registry
//!   - `SyncCore` — inbound/outbound state synchronization
//!   - `LifecycleController` — ordered, idempotent startup and shutdown
//!
//! ## Dependency rule
//! Depends on `megabridge-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod lifecycle;
pub mod ports;
pub mod services;
pub mod session;
pub mod sync_core;

#[cfg(test)]
mod test_support;
