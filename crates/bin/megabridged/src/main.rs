//! # megabridged — megabridge daemon
//!
//! Composition root that wires the MQTT transport and the device registry
//! into the lifecycle controller and runs it.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install tracing with a runtime-adjustable level
//! - Construct the registry and, when a broker is configured, the MQTT connector
//! - Drive the controller through start, configure, the event loop, and shutdown
//! - Shut down gracefully on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;

use megabridge_adapter_mqtt::RumqttcConnector;
use megabridge_adapter_registry_memory::InMemoryRegistry;
use megabridge_app::lifecycle::LifecycleController;
use megabridge_app::ports::PlatformHooks;

use crate::config::{Config, LoggingConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let logger = logging::init(&config.logging.filter, &LoggingConfig::default().filter);

    tracing::info!(
        devices = config.devices.len(),
        broker = config.mqtt.broker.as_deref().unwrap_or("none"),
        "megabridged starting"
    );

    let registry = InMemoryRegistry::new();
    let connector = RumqttcConnector::from_config(config.mqtt.clone());
    if connector.is_none() {
        tracing::warn!("no MQTT broker configured, running without transport");
    }

    let mut controller = LifecycleController::new(config.bridge_settings(), registry, connector)
        .context("invalid bridge configuration")?
        .with_logger(Arc::new(logger));

    controller
        .on_start("daemon started")
        .await
        .context("bridge failed to start")?;
    controller.on_configure().await?;

    controller.run_until(shutdown_signal()).await;

    controller.on_shutdown("shutdown signal received").await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
