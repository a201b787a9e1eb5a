//! Device registry HTTP adapter.
//!
//! Implements [`twin::DeviceRegistry`] and [`twin::RegistryConnector`] over the
//! registry's REST API: JSON over HTTPS with a bearer token obtained from a
//! service-account JWT exchange.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL layout, wire DTOs, pagination, token exchange and
//! status mapping all live here. The [`twin`] and `reconciler` crates see only
//! [`twin::DeviceRegistry`].
//!
//! ## Status mapping
//!
//! Any answer other than `200 OK` becomes [`twin::RegistryError::Status`] with
//! the registry's code and body. Connection failures become
//! [`twin::RegistryError::Transport`]; undecodable success bodies become
//! [`twin::RegistryError::Decode`]. Requests are never retried.

pub mod auth;
pub mod client;
pub mod connector;
pub mod endpoints;
pub mod wire;

pub use auth::{AccessToken, AuthError, ServiceAccount};
pub use client::HttpDeviceRegistry;
pub use connector::ServiceAccountConnector;
pub use endpoints::RegistryEndpoints;
