//! Authentication module for the tuition server.
//!
//! Turns the credentials on a request into a `SecurityContext`.
//!
//! # Supported Authentication Methods
//!
//! - **API Key**: shared keys issued by `issue-key`/`rotate-key`, expiring
//!   after the schema's key lifetime (30 days by default)
//! - **JWT**: user-pool bearer tokens carrying group memberships, verified
//!   with the secret from `TUITION_JWT_SECRET`

mod apikey_authenticator;
mod jwt_authenticator;

pub use apikey_authenticator::{ApiKeyAuthenticator, ApiKeyRecord, IssuedApiKey};
pub use jwt_authenticator::{JwtAuthenticator, JwtClaims, JwtConfig};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tuition_core::security::{SecurityContext, SecurityError, SecurityResult};

/// Verifies one kind of credential.
pub trait CredentialAuthenticator: Send + Sync {
    /// Verify the credential at `now` and return the caller's context.
    fn authenticate(&self, credential: &str, now: DateTime<Utc>) -> SecurityResult<SecurityContext>;
}

/// Credentials presented with a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Credentials {
    /// Nothing presented.
    #[default]
    None,
    /// A shared API key.
    ApiKey(String),
    /// A user-pool bearer token.
    Bearer(String),
}

/// Dispatches credentials to the matching authenticator.
#[derive(Default)]
pub struct Authenticator {
    api_keys: Option<Arc<dyn CredentialAuthenticator>>,
    tokens: Option<Arc<dyn CredentialAuthenticator>>,
}

impl Authenticator {
    /// Create an authenticator that accepts no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept API keys verified by `authenticator`.
    pub fn with_api_keys(mut self, authenticator: Arc<dyn CredentialAuthenticator>) -> Self {
        self.api_keys = Some(authenticator);
        self
    }

    /// Accept bearer tokens verified by `authenticator`.
    pub fn with_tokens(mut self, authenticator: Arc<dyn CredentialAuthenticator>) -> Self {
        self.tokens = Some(authenticator);
        self
    }

    /// Resolve credentials into a security context.
    ///
    /// Missing credentials yield an anonymous context; the access policy
    /// decides what anonymous callers may do.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> SecurityResult<SecurityContext> {
        match credentials {
            Credentials::None => Ok(SecurityContext::anonymous()),
            Credentials::ApiKey(key) => self
                .api_keys
                .as_ref()
                .ok_or_else(|| not_configured("api key"))?
                .authenticate(key, now),
            Credentials::Bearer(token) => self
                .tokens
                .as_ref()
                .ok_or_else(|| not_configured("bearer token"))?
                .authenticate(token, now),
        }
    }
}

fn not_configured(kind: &str) -> SecurityError {
    SecurityError::AuthenticationFailed(format!("{} authentication is not configured", kind))
}
