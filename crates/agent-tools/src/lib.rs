//! Tool registry and clinic tools for the dental clinic agent.
//!
//! This crate provides a `ToolRegistry` for registering and executing the
//! side-effecting capabilities the model may call. It is the only part of
//! the agent that writes appointments or contact data.
//!
//! # Architecture
//!
//! A [`Tool`] publishes a JSON schema and deserializes its arguments into a
//! typed struct that rejects unknown fields. The [`RegistryToolExecutor`]
//! adapter exposes a registry as brain-core's `ToolExecutor`, applying a
//! [`ToolPolicy`] (allowlist, per-call timeout) and turning every error
//! into an unsuccessful `ToolResult` the model can read.
//!
//! # Built-in Tools
//!
//! - [`GetAvailableSlots`] - free start times for a service on a date
//! - [`BookAppointment`] - book a slot, only once the contact's name is known
//! - [`CancelAppointment`] - cancel one of the contact's upcoming appointments
//! - [`RescheduleAppointment`] - move an appointment, keeping its length
//! - [`UpdateName`] - store the contact's name
//! - [`RequestHuman`] - flag the conversation for a staff member
//!
//! The scheduling tools share the rules in [`scheduling`]: future start,
//! inside opening hours, no overlap with a blocking appointment.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_tools::{default_registry, RegistryToolExecutor, ToolPolicy};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn brain_core::ClinicStore> = Arc::new(database::SqliteClinicStore::new(db));
//! let executor = RegistryToolExecutor::with_policy(default_registry(store), ToolPolicy::from_env());
//! ```

mod error;
mod executor;
mod registry;
pub mod scheduling;
mod tool;
pub mod tools;

use std::sync::Arc;

use brain_core::ClinicStore;

pub use error::ToolError;
pub use executor::{RegistryToolExecutor, ToolPolicy, DEFAULT_TOOL_TIMEOUT};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolArgs};
pub use tools::{
    BookAppointment, CancelAppointment, GetAvailableSlots, RequestHuman, RescheduleAppointment,
    UpdateName, HANDOFF_TAG, MAX_NAME_CHARS,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// Create a registry with the six clinic tools, all backed by `store`.
pub fn default_registry(store: Arc<dyn ClinicStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Scheduling
    registry.register(GetAvailableSlots::new(store.clone()));
    registry.register(BookAppointment::new(store.clone()));
    registry.register(CancelAppointment::new(store.clone()));
    registry.register(RescheduleAppointment::new(store.clone()));

    // Identity and escalation
    registry.register(UpdateName::new(store.clone()));
    registry.register(RequestHuman::new(store));

    registry
}
