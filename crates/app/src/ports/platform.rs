//! Host platform ports.
//!
//! [`PlatformHooks`] are the entry points the host framework calls on the
//! bridge; [`LogLevelControl`] is what the bridge calls back to change the
//! active log level.

use std::future::Future;

use megabridge_domain::error::BridgeError;

/// Changes the active log level at runtime.
pub trait LogLevelControl: Send + Sync {
    /// Apply `level` to every megabridge target.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Logging`] when the backend rejects the change.
    fn set_level(&self, level: tracing::Level) -> Result<(), BridgeError>;
}

/// Lifecycle entry points invoked by the host framework.
pub trait PlatformHooks {
    /// Start the bridge: connect, materialize devices, register them.
    fn on_start(&mut self, reason: &str) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Called once the host has registered the devices.
    fn on_configure(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Stop the bridge. Safe to call more than once.
    fn on_shutdown(&mut self, reason: &str)
    -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Change the log level.
    fn on_change_logger_level(&mut self, level: tracing::Level) -> Result<(), BridgeError>;
}
