//! Service-account authentication.
//!
//! The registry issues short-lived access tokens in exchange for a signed JWT
//! assertion (OAuth 2.0 JWT bearer grant). A fresh token is requested for
//! every invocation; nothing is cached.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grant type sent with the assertion.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Credentials of the registry service account.
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub email: String,
    pub key_id: String,
    pub secret: SecretString,
    /// Token endpoint; also used as the assertion audience.
    pub auth_endpoint: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iat: i64,
    exp: i64,
    aud: &'a str,
    iss: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl ServiceAccount {
    /// Signs an HS256 assertion issued at `issued_at` (unix seconds).
    pub fn assertion(&self, issued_at: i64) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        let claims = AssertionClaims {
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
            aud: &self.auth_endpoint,
            iss: &self.email,
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        jsonwebtoken::encode(&header, &claims, &key).map_err(AuthError::Assertion)
    }

    /// Exchanges a freshly signed assertion for an access token.
    pub async fn authenticate(&self, http: &reqwest::Client) -> Result<AccessToken, AuthError> {
        let assertion = self.assertion(Utc::now().timestamp())?;

        let response = http
            .post(&self.auth_endpoint)
            .form(&[
                ("assertion", assertion.as_str()),
                ("grant_type", JWT_BEARER_GRANT),
            ])
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response.json().await.map_err(AuthError::Transport)?;
        let token = body.access_token.ok_or(AuthError::MissingToken)?;
        debug!(email = %self.email, "service account authenticated");
        Ok(AccessToken::new(token))
    }
}

/// A registry access token, sent as `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Failure to obtain an access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to sign service account assertion: {0}")]
    Assertion(#[source] jsonwebtoken::errors::Error),

    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("token endpoint answered with status {status}")]
    Rejected { status: u16 },

    #[error("token endpoint returned no access token")]
    MissingToken,
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Claims {
        iat: i64,
        exp: i64,
        aud: String,
        iss: String,
    }

    fn account() -> ServiceAccount {
        ServiceAccount {
            email: "svc@project.serviceaccount.example".into(),
            key_id: "key-1".into(),
            secret: SecretString::from("s3cret".to_string()),
            auth_endpoint: "https://identity.example/oauth2/token".into(),
        }
    }

    #[test]
    fn assertion_carries_key_id_and_claims() {
        let account = account();
        let token = account.assertion(1_600_000_000).unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.kid.as_deref(), Some("key-1"));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_audience(&[account.auth_endpoint.as_str()]);
        let data = decode::<Claims>(&token, &DecodingKey::from_secret(b"s3cret"), &validation)
            .unwrap();

        assert_eq!(data.claims.iat, 1_600_000_000);
        assert_eq!(data.claims.exp, 1_600_000_000 + ASSERTION_LIFETIME_SECS);
        assert_eq!(data.claims.aud, account.auth_endpoint);
        assert_eq!(data.claims.iss, account.email);
    }

    #[test]
    fn token_debug_output_is_redacted() {
        let token = AccessToken::new("very-secret-token");
        assert!(!format!("{token:?}").contains("very-secret-token"));
        assert_eq!(token.expose(), "very-secret-token");
    }
}
