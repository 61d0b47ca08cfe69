//! JWT (JSON Web Token) based authentication for user-pool identities.
//!
//! # JWT Claims
//!
//! The JWT must contain:
//! - `sub`: Subject (user identifier)
//! - `exp`: Expiration timestamp (Unix timestamp)
//!
//! Optional claims:
//! - `groups` and `cognito:groups`: group memberships, merged when both are present
//! - `iat`, `iss`, `aud`
//!
//! # Example JWT Payload
//!
//! ```json
//! {
//!   "sub": "user-123",
//!   "cognito:groups": ["ADMINS"],
//!   "exp": 1735689600,
//!   "iss": "tuition-auth"
//! }
//! ```

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use tuition_core::security::{SecurityContext, SecurityError, SecurityResult};

use super::CredentialAuthenticator;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user identifier).
    pub sub: String,

    /// Group memberships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Group memberships as issued by Cognito user pools.
    #[serde(
        default,
        rename = "cognito:groups",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cognito_groups: Vec<String>,

    /// Expiration time (Unix timestamp).
    pub exp: u64,

    /// Issued at time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl JwtClaims {
    /// Groups from both claims, first occurrence kept.
    pub fn all_groups(&self) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for group in self.groups.iter().chain(&self.cognito_groups) {
            if !merged.contains(group) {
                merged.push(group.clone());
            }
        }
        merged
    }
}

/// Token acceptance rules.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signature algorithm tokens must use.
    pub algorithm: Algorithm,
    pub required_issuer: Option<String>,
    pub required_audience: Option<String>,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::HS256,
            required_issuer: None,
            required_audience: None,
            leeway_secs: 60,
        }
    }
}

/// Verifies user-pool tokens and turns them into group-carrying contexts.
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtAuthenticator {
    /// HMAC-signed tokens.
    pub fn with_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            config: JwtConfig::default(),
        }
    }

    pub fn with_secret_str(secret: &str) -> Self {
        Self::with_secret(secret.as_bytes())
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.required_issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.config.required_audience = Some(audience.into());
        self
    }

    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.config.leeway_secs = secs;
        self
    }

    /// Check signature, issuer, and audience, and return the claims.
    ///
    /// Expiry is not checked here; see [`JwtAuthenticator::check_expiry`].
    pub fn verify_token(&self, token: &str) -> SecurityResult<JwtClaims> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        if let Some(iss) = &self.config.required_issuer {
            validation.set_issuer(&[iss]);
        }
        match &self.config.required_audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| SecurityError::AuthenticationFailed(format!("invalid token: {}", e)))
    }

    /// Reject claims whose `exp` lies before `now`, allowing for leeway.
    pub fn check_expiry(&self, claims: &JwtClaims, now: DateTime<Utc>) -> SecurityResult<()> {
        let deadline = claims.exp.saturating_add(self.config.leeway_secs);
        let now = u64::try_from(now.timestamp()).unwrap_or_default();
        if now >= deadline {
            return Err(SecurityError::AuthenticationFailed(format!(
                "token for {} expired",
                claims.sub
            )));
        }
        Ok(())
    }
}

impl CredentialAuthenticator for JwtAuthenticator {
    fn authenticate(&self, credential: &str, now: DateTime<Utc>) -> SecurityResult<SecurityContext> {
        let token = credential
            .strip_prefix("Bearer ")
            .or_else(|| credential.strip_prefix("bearer "))
            .unwrap_or(credential);

        let claims = self.verify_token(token)?;
        self.check_expiry(&claims, now)?;
        if claims.sub.is_empty() {
            return Err(SecurityError::AuthenticationFailed(
                "token has an empty subject".to_string(),
            ));
        }

        let groups = claims.all_groups();
        Ok(SecurityContext::user(claims.sub, groups))
    }
}
