//! API key based authentication.
//!
//! Keys are shared secrets of the form `tk_<64 hex chars>`. Only their blake3
//! hash is stored, in the `auth:api_keys` tree, next to the key's metadata.
//! A key is valid from issue until `expires_at` unless revoked first.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use tuition_core::error::Error as CoreError;
use tuition_core::security::{SecurityContext, SecurityError, SecurityResult};

use super::CredentialAuthenticator;

/// Tree holding API key records, keyed by key hash.
const API_KEY_TREE: &str = "auth:api_keys";

/// Prefix of every issued secret.
const KEY_PREFIX: &str = "tk_";

/// Stored metadata for an API key. Never contains the secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    /// Public identifier of the key.
    pub key_id: String,
    /// Optional operator note.
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
}

impl ApiKeyRecord {
    /// Check if the key is usable at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// A freshly issued key. The secret is only available here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKey {
    pub key_id: String,
    pub api_key: String,
    pub expires_at: DateTime<Utc>,
}

/// API key authenticator backed by a sled tree.
pub struct ApiKeyAuthenticator {
    tree: Tree,
    lifetime: Duration,
}

impl ApiKeyAuthenticator {
    /// Open the key store in the given database.
    pub fn open(db: &Db, lifetime: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            tree: db.open_tree(API_KEY_TREE)?,
            lifetime,
        })
    }

    /// Lifetime given to newly issued keys.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a new key valid for the configured lifetime.
    pub fn issue(&self, description: Option<&str>, now: DateTime<Utc>) -> SecurityResult<IssuedApiKey> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        let api_key = format!("{}{}", KEY_PREFIX, hex::encode(secret));

        let hash = blake3::hash(api_key.as_bytes());
        let record = ApiKeyRecord {
            key_id: hash.to_hex()[..16].to_string(),
            description: description.map(str::to_string),
            created_at: now,
            expires_at: now + self.lifetime,
            revoked: false,
        };

        self.tree
            .insert(hash.as_bytes(), encode_record(&record)?)
            .map_err(storage)?;
        self.tree.flush().map_err(storage)?;

        tracing::info!(key_id = %record.key_id, expires_at = %record.expires_at, "api key issued");
        Ok(IssuedApiKey {
            key_id: record.key_id,
            api_key,
            expires_at: record.expires_at,
        })
    }

    /// Issue a new key and revoke every key issued before it.
    pub fn rotate(&self, description: Option<&str>, now: DateTime<Utc>) -> SecurityResult<IssuedApiKey> {
        let previous: Vec<String> = self
            .list()?
            .into_iter()
            .filter(|record| !record.revoked)
            .map(|record| record.key_id)
            .collect();

        let issued = self.issue(description, now)?;
        for key_id in &previous {
            self.revoke(key_id)?;
        }

        tracing::info!(key_id = %issued.key_id, revoked = previous.len(), "api key rotated");
        Ok(issued)
    }

    /// Revoke a key by id. Returns false if no such key exists.
    pub fn revoke(&self, key_id: &str) -> SecurityResult<bool> {
        for entry in self.tree.iter() {
            let (hash, bytes) = entry.map_err(storage)?;
            let mut record = decode_record(&bytes)?;
            if record.key_id != key_id {
                continue;
            }
            if !record.revoked {
                record.revoked = true;
                self.tree
                    .insert(hash, encode_record(&record)?)
                    .map_err(storage)?;
                self.tree.flush().map_err(storage)?;
                tracing::info!(key_id, "api key revoked");
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// List all key records, including revoked and expired ones.
    pub fn list(&self) -> SecurityResult<Vec<ApiKeyRecord>> {
        self.tree
            .iter()
            .map(|entry| {
                let (_, bytes) = entry.map_err(storage)?;
                decode_record(&bytes)
            })
            .collect()
    }

    /// Verify a presented key at `now`.
    pub fn verify(&self, api_key: &str, now: DateTime<Utc>) -> SecurityResult<ApiKeyRecord> {
        let hash = blake3::hash(api_key.as_bytes());
        let bytes = self
            .tree
            .get(hash.as_bytes())
            .map_err(storage)?
            .ok_or_else(|| SecurityError::AuthenticationFailed("invalid API key".to_string()))?;
        let record = decode_record(&bytes)?;

        if record.revoked {
            return Err(SecurityError::ApiKeyRevoked(record.key_id));
        }
        if now >= record.expires_at {
            return Err(SecurityError::ApiKeyExpired {
                key_id: record.key_id,
                expired_at: record.expires_at.to_rfc3339(),
            });
        }
        Ok(record)
    }
}

impl CredentialAuthenticator for ApiKeyAuthenticator {
    fn authenticate(&self, credential: &str, now: DateTime<Utc>) -> SecurityResult<SecurityContext> {
        let record = self.verify(credential, now)?;
        Ok(SecurityContext::api_key(record.key_id))
    }
}

fn storage(err: sled::Error) -> SecurityError {
    SecurityError::Storage(err.into())
}

fn encode_record(record: &ApiKeyRecord) -> SecurityResult<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| SecurityError::Storage(CoreError::Serialization(e.to_string())))
}

fn decode_record(bytes: &[u8]) -> SecurityResult<ApiKeyRecord> {
    serde_json::from_slice(bytes)
        .map_err(|e| SecurityError::Storage(CoreError::Deserialization(e.to_string())))
}
