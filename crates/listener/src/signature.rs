//! Delivery signature validation.
//!
//! Every delivery carries an `x-dt-signature` header: an HS256 JWT signed with
//! the shared signature secret whose claims hold a hex digest of the raw
//! request body. `checksum` is SHA-1; `checksum_sha256`, when present, is
//! SHA-256 and takes precedence.

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use twin::{Status, STATUS_BAD_REQUEST};

/// Header carrying the signed checksum token.
pub const SIGNATURE_HEADER: &str = "x-dt-signature";

#[derive(Debug, Deserialize)]
struct SignatureClaims {
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    checksum_sha256: Option<String>,
}

/// Rejection reasons for an incoming delivery.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// No signature secret is configured; every delivery is rejected.
    #[error("no signature secret configured")]
    MissingSecret,

    #[error("request carries no x-dt-signature header")]
    MissingHeader,

    #[error("signature token rejected: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("body checksum does not match the signed checksum")]
    ChecksumMismatch,
}

impl SignatureError {
    /// Response message for this rejection.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingSecret => "missing secret",
            Self::MissingHeader => "missing header",
            Self::InvalidToken(_) => "signature error",
            Self::ChecksumMismatch => "checksum mismatch",
        }
    }

    pub fn to_status(&self) -> Status {
        Status::new(self.message(), STATUS_BAD_REQUEST)
    }
}

/// Validates delivery signatures against the configured secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Option<SecretString>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<SecretString>) -> Self {
        Self { secret }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks `header` (the raw signature header value) against `body`.
    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
        let secret = self.secret.as_ref().ok_or(SignatureError::MissingSecret)?;
        let token = header.ok_or(SignatureError::MissingHeader)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
        let claims = jsonwebtoken::decode::<SignatureClaims>(token, &key, &validation)
            .map_err(SignatureError::InvalidToken)?
            .claims;

        let matches = match (&claims.checksum_sha256, &claims.checksum) {
            (Some(signed), _) => digest_matches(signed, &hex::encode(Sha256::digest(body))),
            (None, Some(signed)) => digest_matches(signed, &hex::encode(Sha1::digest(body))),
            (None, None) => false,
        };

        if matches {
            Ok(())
        } else {
            Err(SignatureError::ChecksumMismatch)
        }
    }
}

fn digest_matches(signed: &str, computed: &str) -> bool {
    let signed = signed.to_ascii_lowercase();
    signed.as_bytes().ct_eq(computed.as_bytes()).into()
}
