//! Error types for the twin reconciliation domain.
//!
//! [`RegistryError`] is what a [`crate::DeviceRegistry`] implementation reports
//! when a registry call does not succeed. [`ReconcileError`] covers the
//! conditions that abort an invocation; each one knows the `(message, status)`
//! pair the caller receives.
//!
//! Best-effort failures (rename, cleanup delete) never become a
//! [`ReconcileError`]; they are recorded in the step journal and logged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DeviceId, Status, STATUS_BAD_GATEWAY, STATUS_BAD_REQUEST};

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// A registry call that did not succeed.
///
/// Calls are single-attempt: the reconciler never retries, so there is no
/// retry classification here.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RegistryError {
    /// The registry answered with a non-success status.
    #[error("registry answered with status {code}: {body}")]
    Status {
        /// HTTP status code returned by the registry.
        code: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The registry could not be reached (connection, TLS, timeout).
    #[error("registry request failed: {0}")]
    Transport(String),

    /// The registry answered with success but the body could not be decoded.
    #[error("registry response could not be decoded: {0}")]
    Decode(String),
}

impl RegistryError {
    /// Status code mirrored to the caller.
    ///
    /// Registry status codes are passed through; failures that produced no
    /// status are reported as `502`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Status { code, .. } => *code,
            Self::Transport(_) | Self::Decode(_) => STATUS_BAD_GATEWAY,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation errors
// ---------------------------------------------------------------------------

/// Conditions that abort a reconciliation.
///
/// Steps already performed before the failure are not rolled back.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The event's target name is not `projects/{project}/devices/{device}`.
    #[error("invalid target name '{target_name}'")]
    InvalidTarget {
        /// The target name as received.
        target_name: String,
    },

    /// The device roster could not be fetched.
    #[error("could not list devices")]
    ListDevices {
        #[source]
        source: RegistryError,
    },

    /// The event's source device is absent from the roster snapshot.
    #[error("could not find original device {device}")]
    OriginalDeviceNotFound {
        /// Id of the device the event refers to.
        device: DeviceId,
    },

    /// The registry did not accept the request to create a twin.
    #[error("could not spawn twin for {original}")]
    Spawn {
        /// Id of the original device the twin was meant for.
        original: DeviceId,
        #[source]
        source: RegistryError,
    },

    /// The registry did not accept the new modelled value.
    #[error("could not publish to twin {twin}")]
    Publish {
        /// Id of the twin the value was meant for.
        twin: DeviceId,
        #[source]
        source: RegistryError,
    },
}

impl ReconcileError {
    /// Status code reported to the caller.
    ///
    /// Input inconsistencies and a refused spawn are client errors; a failed
    /// roster fetch or publish mirrors the registry's status.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTarget { .. } | Self::OriginalDeviceNotFound { .. } | Self::Spawn { .. } => {
                STATUS_BAD_REQUEST
            }
            Self::ListDevices { source } | Self::Publish { source, .. } => source.status_code(),
        }
    }

    /// The message reported to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "invalid target name",
            Self::ListDevices { .. } => "ERROR: could not list devices",
            Self::OriginalDeviceNotFound { .. } => "could not find original device",
            Self::Spawn { .. } => "ERROR: could not spawn twin",
            Self::Publish { .. } => "ERROR: bad emit response",
        }
    }

    /// The `(message, status)` pair reported to the caller.
    pub fn to_status(&self) -> Status {
        Status::new(self.message(), self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> DeviceId {
        DeviceId::new(id).unwrap()
    }

    #[test]
    fn registry_status_is_mirrored() {
        let err = RegistryError::Status {
            code: 503,
            body: String::new(),
        };
        assert_eq!(err.status_code(), 503);
        assert_eq!(
            RegistryError::Transport("connection refused".into()).status_code(),
            STATUS_BAD_GATEWAY
        );
    }

    #[test]
    fn input_errors_are_client_errors() {
        let err = ReconcileError::OriginalDeviceNotFound {
            device: device("abc"),
        };
        assert_eq!(
            err.to_status(),
            Status::new("could not find original device", 400)
        );

        let err = ReconcileError::Spawn {
            original: device("abc"),
            source: RegistryError::Status {
                code: 500,
                body: String::new(),
            },
        };
        assert_eq!(err.to_status(), Status::new("ERROR: could not spawn twin", 400));
    }

    #[test]
    fn publish_failure_mirrors_registry_status() {
        let err = ReconcileError::Publish {
            twin: device("emu1"),
            source: RegistryError::Status {
                code: 404,
                body: "not found".into(),
            },
        };
        assert_eq!(err.to_status(), Status::new("ERROR: bad emit response", 404));
    }
}
