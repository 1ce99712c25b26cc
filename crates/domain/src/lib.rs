//! # megabridge-domain
//!
//! Pure domain model for the MegaD ↔ device-registry bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions
//! - Define **device configuration** (what the operator declared) and
//!   **device records** (what the bridge tracks at runtime)
//! - Define the per-device **sync state** machine (`Unknown → Synced(bool)`)
//! - Define **capabilities** as a tagged variant rather than a class hierarchy
//! - Define the **topic codec** mapping MQTT topics/payloads to
//!   `(DeviceId, bool)` and back
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod attribute;
pub mod capability;
pub mod command;
pub mod device;
pub mod topic;
