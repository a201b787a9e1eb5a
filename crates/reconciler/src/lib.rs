//! Twin reconciliation executor.
//!
//! This crate drives one event through the decisions defined in the [`twin`]
//! crate: it fetches the roster, issues the registry commands the decision
//! requires, and reports the `(message, status)` outcome together with a
//! journal of every step taken.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The executor sequences calls between the pure
//! decision functions in [`twin::plan`] and a [`twin::DeviceRegistry`]. It
//! contains no domain rules of its own.
//!
//! ## Failure handling
//!
//! | Step | Disposition | On failure |
//! |------|-------------|------------|
//! | list devices | fatal | status mirrored from the registry |
//! | create twin | fatal | `400`, later steps skipped |
//! | publish value | fatal | status mirrored from the registry |
//! | delete twin (cleanup) | best-effort | logged, next delete attempted |
//! | rename twin | best-effort | logged, invocation continues |
//!
//! Nothing is retried.

pub mod executor;
pub mod journal;
pub mod memory;

pub use executor::{
    Reconciler, MSG_MODIFIED, MSG_NON_FLOAT, MSG_NO_EMULATION, MSG_OK, MSG_REMOVED,
};
pub use journal::{Reconciliation, StepOutcome, StepRecord};
pub use memory::{InMemoryRegistry, Operation, RegistryCall};
