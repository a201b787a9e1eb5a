//! Webhook receiver.
//!
//! Binds the reconciler to HTTP: each `POST /` delivery is signature-checked,
//! decoded, authorised against the registry and reconciled. The
//! reconciliation's `(message, status)` becomes the response.
//!
//! ## Request flow
//!
//! | Step | Failure response |
//! |------|------------------|
//! | Verify `x-dt-signature` | `400` `missing secret` / `missing header` / `signature error` / `checksum mismatch` |
//! | Decode the delivery body | `400` `invalid payload` |
//! | Connect to the registry | `401` `Not Authenticated` |
//! | Reconcile | whatever the reconciler reports |
//!
//! Every delivery runs inside an `invocation` span carrying a fresh
//! [`twin::InvocationId`]; completion is logged with status and elapsed time.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP framing and request authentication live here. The
//! registry is reached only through [`twin::RegistryConnector`], so the router
//! is independent of the registry transport.

pub mod error;
pub mod server;
pub mod signature;

pub use error::WebhookError;
pub use server::{build_router, AppState};
pub use signature::{SignatureError, SignatureVerifier, SIGNATURE_HEADER};
