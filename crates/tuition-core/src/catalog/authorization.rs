//! Authorization rule declarations attached to models and custom operations.

use rkyv::{Archive, Deserialize, Serialize};

/// Default lifetime of a shared API key, in days.
pub const DEFAULT_API_KEY_EXPIRY_DAYS: u32 = 30;

/// Operations exposed per model by the generated API.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ModelOperation {
    /// Insert a new row.
    Create,
    /// Fetch a single row by identifier.
    Read,
    /// Modify an existing row.
    Update,
    /// Remove a row.
    Delete,
    /// Enumerate rows.
    List,
}

impl ModelOperation {
    /// Every model operation.
    pub const ALL: [ModelOperation; 5] = [
        ModelOperation::Create,
        ModelOperation::Read,
        ModelOperation::Update,
        ModelOperation::Delete,
        ModelOperation::List,
    ];
}

impl std::fmt::Display for ModelOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelOperation::Create => write!(f, "create"),
            ModelOperation::Read => write!(f, "read"),
            ModelOperation::Update => write!(f, "update"),
            ModelOperation::Delete => write!(f, "delete"),
            ModelOperation::List => write!(f, "list"),
        }
    }
}

/// Mechanism by which a caller proves who they are.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    /// Shared, expiring API key.
    ApiKey,
    /// User-pool identity carrying group claims.
    UserPool,
}

/// An access rule. A request is allowed when any rule attached to the target matches.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase", tag = "allow")]
pub enum AuthRule {
    /// Any holder of a valid shared API key.
    PublicApiKey {
        /// Operations granted.
        operations: Vec<ModelOperation>,
    },
    /// Members of a named group.
    Group {
        /// Group name.
        group: String,
        /// Operations granted.
        operations: Vec<ModelOperation>,
    },
}

impl AuthRule {
    /// API-key rule granting every model operation.
    pub fn public_api_key() -> Self {
        AuthRule::PublicApiKey {
            operations: ModelOperation::ALL.to_vec(),
        }
    }

    /// Group rule granting every model operation.
    pub fn group(group: impl Into<String>) -> Self {
        AuthRule::Group {
            group: group.into(),
            operations: ModelOperation::ALL.to_vec(),
        }
    }

    /// Restrict the rule to the given operations.
    pub fn to(self, operations: impl IntoIterator<Item = ModelOperation>) -> Self {
        let operations = operations.into_iter().collect();
        match self {
            AuthRule::PublicApiKey { .. } => AuthRule::PublicApiKey { operations },
            AuthRule::Group { group, .. } => AuthRule::Group { group, operations },
        }
    }

    /// Operations this rule grants.
    pub fn operations(&self) -> &[ModelOperation] {
        match self {
            AuthRule::PublicApiKey { operations } | AuthRule::Group { operations, .. } => {
                operations
            }
        }
    }

    /// Check whether the rule grants the operation.
    pub fn grants(&self, operation: ModelOperation) -> bool {
        self.operations().contains(&operation)
    }

    /// The authorization mode a caller must use to satisfy this rule.
    pub fn mode(&self) -> AuthMode {
        match self {
            AuthRule::PublicApiKey { .. } => AuthMode::ApiKey,
            AuthRule::Group { .. } => AuthMode::UserPool,
        }
    }
}

/// Schema-wide authorization mode settings.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationModes {
    /// Mode assumed by clients that do not specify one.
    pub default_mode: AuthMode,
    /// Lifetime of issued API keys, in days.
    pub api_key_expires_in_days: u32,
}

impl Default for AuthorizationModes {
    fn default() -> Self {
        Self {
            default_mode: AuthMode::ApiKey,
            api_key_expires_in_days: DEFAULT_API_KEY_EXPIRY_DAYS,
        }
    }
}

impl AuthorizationModes {
    /// Lifetime of issued API keys.
    pub fn api_key_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.api_key_expires_in_days))
    }
}
