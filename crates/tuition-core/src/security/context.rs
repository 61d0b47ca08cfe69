//! Security context that flows through every request.
//!
//! The context records how the caller authenticated and which groups it
//! belongs to; access decisions are made against it by `AccessPolicy`.

use crate::catalog::AuthMode;
use crate::storage::key::current_timestamp;
use std::collections::BTreeSet;

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No credentials presented.
    Anonymous,
    /// Holder of a shared API key.
    ApiKey {
        /// Identifier of the key (never the secret).
        key_id: String,
    },
    /// A user-pool identity.
    User {
        /// Subject identifier.
        user_id: String,
    },
}

/// Request-scoped security context.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    /// Authenticated principal.
    pub principal: Principal,
    /// Group memberships (user-pool identities only).
    pub groups: BTreeSet<String>,
    /// Timestamp when the context was created.
    pub created_at: u64,
}

impl SecurityContext {
    /// Context for a caller with no credentials.
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::Anonymous,
            groups: BTreeSet::new(),
            created_at: current_timestamp(),
        }
    }

    /// Context for a verified API key.
    pub fn api_key(key_id: impl Into<String>) -> Self {
        Self {
            principal: Principal::ApiKey {
                key_id: key_id.into(),
            },
            groups: BTreeSet::new(),
            created_at: current_timestamp(),
        }
    }

    /// Context for a verified user-pool identity.
    pub fn user<I, S>(user_id: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principal: Principal::User {
                user_id: user_id.into(),
            },
            groups: groups.into_iter().map(Into::into).collect(),
            created_at: current_timestamp(),
        }
    }

    /// Authorization mode the caller used, if any.
    pub fn auth_mode(&self) -> Option<AuthMode> {
        match self.principal {
            Principal::Anonymous => None,
            Principal::ApiKey { .. } => Some(AuthMode::ApiKey),
            Principal::User { .. } => Some(AuthMode::UserPool),
        }
    }

    /// Check group membership.
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Check if the caller presented no credentials.
    pub fn is_anonymous(&self) -> bool {
        self.principal == Principal::Anonymous
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match &self.principal {
            Principal::Anonymous => "anonymous".to_string(),
            Principal::ApiKey { key_id } => format!("api-key:{}", key_id),
            Principal::User { user_id } => format!("user:{}", user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_context() {
        let ctx = SecurityContext::anonymous();
        assert!(ctx.is_anonymous());
        assert_eq!(ctx.auth_mode(), None);
        assert!(!ctx.in_group("ADMINS"));
    }

    #[test]
    fn test_api_key_context() {
        let ctx = SecurityContext::api_key("key-1");
        assert_eq!(ctx.auth_mode(), Some(AuthMode::ApiKey));
        assert_eq!(ctx.describe(), "api-key:key-1");
        assert!(ctx.groups.is_empty());
    }

    #[test]
    fn test_user_context_groups() {
        let ctx = SecurityContext::user("u-7", ["ADMINS", "STAFF"]);
        assert_eq!(ctx.auth_mode(), Some(AuthMode::UserPool));
        assert!(ctx.in_group("ADMINS"));
        assert!(!ctx.in_group("admins"));
    }
}
