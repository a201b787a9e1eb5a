//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging a
//! [`ProjectId`] with a [`DeviceId`] even though both are strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: registry-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a project in the device registry.
    ///
    /// Taken from the second segment of an event's `projects/{project}/devices/{device}`
    /// target name.
    ProjectId
}

string_id! {
    /// Identifies a device within a project.
    ///
    /// This is the last segment of the registry resource name, never the full
    /// `projects/.../devices/...` path. Emulated twins carry a registry-specific
    /// prefix on this value (see [`crate::ReconcilerConfig::twin_id_prefix`]).
    DeviceId
}

impl DeviceId {
    /// Returns `true` if the identifier starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed
// ---------------------------------------------------------------------------

/// Identifies a single reconciliation invocation (one received event).
///
/// Generated fresh for every webhook delivery; propagated through spans so all
/// registry activity caused by one event can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifiers_are_rejected() {
        assert!(DeviceId::new("").is_none());
        assert!(ProjectId::new(String::new()).is_none());
    }

    #[test]
    fn device_id_prefix_check_is_syntactic() {
        let twin = DeviceId::new("emuc1l2k3j4").unwrap();
        let sensor = DeviceId::new("bjei2m2o7").unwrap();

        assert!(twin.has_prefix("emu"));
        assert!(!sensor.has_prefix("emu"));
    }

    #[test]
    fn device_id_serializes_as_plain_string() {
        let id = DeviceId::new("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
