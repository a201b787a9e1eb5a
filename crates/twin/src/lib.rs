//! Core domain for the twin reconciler.
//!
//! This crate contains every domain concept, newtype identifier, value type and
//! error type used to keep an emulated ("twin") device consistent with the
//! real device it models. Infrastructure crates implement the ports defined
//! here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* registry operations are needed and *which* ones an event
//! requires; infrastructure crates define *how* to perform them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ProjectId`, `DeviceId`, `InvocationId`) |
//! | [`types`] | Value types (`Device`, `Labels`, `TemperatureReading`, `Status`, ...) |
//! | [`event`] | Webhook deliveries, events and label deltas |
//! | [`config`] | `ReconcilerConfig`: label keys and twin naming conventions |
//! | [`decay`] | The temperature decay model |
//! | [`locator`] | Twin and original-device lookups over a roster |
//! | [`plan`] | Pure decision functions producing registry commands |
//! | [`registry`] | `DeviceRegistry` and `RegistryConnector` ports |
//! | [`errors`] | `RegistryError` and `ReconcileError` |

pub mod config;
pub mod decay;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod locator;
pub mod plan;
pub mod registry;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::ReconcilerConfig;
pub use errors::{ReconcileError, RegistryError};
pub use event::{Delivery, Event, EventKind, LabelChange, LabelDelta, Target};
pub use identifiers::{DeviceId, InvocationId, ProjectId};
pub use plan::{Decision, Disposition, ModelUpdate, RegistryCommand, Synchronize, TwinState};
pub use registry::{DeviceRegistry, PublishPayload, RegistryConnector, TemperatureSample};
pub use types::{
    Device, Labels, ReportedState, Status, TemperatureReading, Timestamp, STATUS_BAD_GATEWAY,
    STATUS_BAD_REQUEST, STATUS_OK,
};
