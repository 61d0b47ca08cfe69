//! Access policy evaluation.
//!
//! A request is allowed when any rule attached to its target matches the
//! caller. Targets without rules fall back to `UnlabeledAccess`.

use super::context::SecurityContext;
use super::error::{SecurityError, SecurityResult};
use crate::catalog::{AuthMode, AuthRule, AuthorizationModes, CustomOperationDef, EntityDef, ModelOperation};
use std::fmt;
use std::str::FromStr;

/// What happens to models and operations that declare no access rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlabeledAccess {
    /// Nobody may access them.
    #[default]
    Deny,
    /// Any caller authenticated with the schema's default mode may access them.
    DefaultMode,
}

impl FromStr for UnlabeledAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deny" => Ok(UnlabeledAccess::Deny),
            "default-mode" => Ok(UnlabeledAccess::DefaultMode),
            other => Err(format!(
                "unknown unlabeled access policy '{}' (expected deny or default-mode)",
                other
            )),
        }
    }
}

impl fmt::Display for UnlabeledAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlabeledAccess::Deny => write!(f, "deny"),
            UnlabeledAccess::DefaultMode => write!(f, "default-mode"),
        }
    }
}

/// Evaluates declared access rules against a security context.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    unlabeled: UnlabeledAccess,
    default_mode: AuthMode,
}

impl AccessPolicy {
    /// Create a policy for a schema's authorization modes.
    pub fn new(unlabeled: UnlabeledAccess, modes: &AuthorizationModes) -> Self {
        Self {
            unlabeled,
            default_mode: modes.default_mode,
        }
    }

    /// Policy applied to unlabeled targets.
    pub fn unlabeled(&self) -> UnlabeledAccess {
        self.unlabeled
    }

    /// Authorize a model operation.
    pub fn authorize_model(
        &self,
        ctx: &SecurityContext,
        entity: &EntityDef,
        operation: ModelOperation,
    ) -> SecurityResult<()> {
        let allowed = if entity.has_authorization() {
            entity
                .authorization
                .iter()
                .any(|rule| rule.grants(operation) && rule_matches(ctx, rule))
        } else {
            self.unlabeled_allows(ctx)
        };

        if allowed {
            Ok(())
        } else {
            Err(self.denial(ctx, format!("cannot {} {}", operation, entity.name)))
        }
    }

    /// Authorize a custom operation. Rules match on mode and group only.
    pub fn authorize_operation(
        &self,
        ctx: &SecurityContext,
        operation: &CustomOperationDef,
    ) -> SecurityResult<()> {
        let allowed = if operation.authorization.is_empty() {
            self.unlabeled_allows(ctx)
        } else {
            operation
                .authorization
                .iter()
                .any(|rule| rule_matches(ctx, rule))
        };

        if allowed {
            Ok(())
        } else {
            Err(self.denial(ctx, format!("cannot invoke {}", operation.name)))
        }
    }

    fn unlabeled_allows(&self, ctx: &SecurityContext) -> bool {
        match self.unlabeled {
            UnlabeledAccess::Deny => false,
            UnlabeledAccess::DefaultMode => ctx.auth_mode() == Some(self.default_mode),
        }
    }

    fn denial(&self, ctx: &SecurityContext, message: String) -> SecurityError {
        tracing::debug!(caller = %ctx.describe(), %message, "access denied");
        if ctx.is_anonymous() {
            SecurityError::AuthenticationFailed(format!("no credentials presented: {}", message))
        } else {
            SecurityError::PermissionDenied(message)
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(UnlabeledAccess::default(), &AuthorizationModes::default())
    }
}

fn rule_matches(ctx: &SecurityContext, rule: &AuthRule) -> bool {
    match rule {
        AuthRule::PublicApiKey { .. } => ctx.auth_mode() == Some(AuthMode::ApiKey),
        AuthRule::Group { group, .. } => {
            ctx.auth_mode() == Some(AuthMode::UserPool) && ctx.in_group(group)
        }
    }
}
