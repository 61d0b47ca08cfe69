//! Security-specific error types.

use thiserror::Error;

/// Security-related errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The caller is known but not allowed to perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Credentials were presented but could not be verified.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API key was valid once but has expired.
    #[error("api key {key_id} expired at {expired_at}")]
    ApiKeyExpired {
        /// Key identifier.
        key_id: String,
        /// Expiry instant (RFC 3339).
        expired_at: String,
    },

    /// The API key was revoked.
    #[error("api key {0} has been revoked")]
    ApiKeyRevoked(String),

    /// Invalid security context.
    #[error("invalid security context: {0}")]
    InvalidContext(String),

    /// Storage error during key operations.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),
}

impl SecurityError {
    /// True for failures to establish identity (as opposed to lacking access).
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            SecurityError::AuthenticationFailed(_)
                | SecurityError::ApiKeyExpired { .. }
                | SecurityError::ApiKeyRevoked(_)
        )
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SecurityError::PermissionDenied("cannot read student".to_string());
        assert!(err.to_string().contains("cannot read student"));

        let err = SecurityError::ApiKeyExpired {
            key_id: "k1".into(),
            expired_at: "2025-01-01T00:00:00Z".into(),
        };
        assert!(err.to_string().contains("k1"));
        assert!(err.is_authentication());
    }

    #[test]
    fn test_permission_denied_is_not_authentication() {
        let err = SecurityError::PermissionDenied("nope".into());
        assert!(!err.is_authentication());
    }
}
