//! Server configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tuition_core::catalog::DEFAULT_API_KEY_EXPIRY_DAYS;
use tuition_core::storage::{StorageConfig, DEFAULT_CACHE_MB, DEFAULT_FLUSH_EVERY_MS};
use tuition_core::{ReferentialPolicy, UnlabeledAccess};

/// Default path of the data directory.
pub const DEFAULT_DATA_PATH: &str = "./tuition_data";

/// Environment variable holding the JWT secret.
pub const JWT_SECRET_ENV: &str = "TUITION_JWT_SECRET";

/// Tuition server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the data directory.
    pub data_path: PathBuf,

    /// Keep all data in memory and discard it on exit.
    pub temporary: bool,

    /// Row cache size in megabytes.
    pub cache_mb: u64,

    /// Background flush interval for on-disk trees. None flushes only when asked.
    pub flush_every_ms: Option<u64>,

    /// Lifetime of newly issued API keys, in days.
    pub api_key_expiry_days: u32,

    /// How belongs-to edges are enforced.
    pub referential_policy: ReferentialPolicy,

    /// Access to models that declare no rule.
    pub unlabeled_access: UnlabeledAccess,

    /// HMAC secret for user-pool tokens. None disables bearer tokens.
    pub jwt_secret: Option<String>,

    /// Required token issuer, if any.
    pub jwt_issuer: Option<String>,

    /// Extra groups created in the identity directory. Groups named by
    /// operation rules are always created; who may call an operation is
    /// decided by the schema alone.
    pub directory_groups: Vec<String>,

    /// Users known to the identity directory.
    pub directory_users: Vec<String>,
}

impl ServerConfig {
    /// Create a new server configuration with the given data path.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            temporary: false,
            cache_mb: DEFAULT_CACHE_MB,
            flush_every_ms: Some(DEFAULT_FLUSH_EVERY_MS),
            api_key_expiry_days: DEFAULT_API_KEY_EXPIRY_DAYS,
            referential_policy: ReferentialPolicy::default(),
            unlabeled_access: UnlabeledAccess::default(),
            jwt_secret: None,
            jwt_issuer: None,
            directory_groups: Vec::new(),
            directory_users: Vec::new(),
        }
    }

    /// In-memory configuration, mostly for tests.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    /// Set the row cache size.
    pub fn with_cache_mb(mut self, megabytes: u64) -> Self {
        self.cache_mb = megabytes;
        self
    }

    /// Set the background flush interval.
    pub fn with_flush_every_ms(mut self, interval: Option<u64>) -> Self {
        self.flush_every_ms = interval;
        self
    }

    /// Set the API key lifetime in days.
    pub fn with_api_key_expiry_days(mut self, days: u32) -> Self {
        self.api_key_expiry_days = days;
        self
    }

    /// Set the referential policy.
    pub fn with_referential_policy(mut self, policy: ReferentialPolicy) -> Self {
        self.referential_policy = policy;
        self
    }

    /// Set the policy for models without access rules.
    pub fn with_unlabeled_access(mut self, access: UnlabeledAccess) -> Self {
        self.unlabeled_access = access;
        self
    }

    /// Enable bearer tokens signed with `secret`.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Require tokens from `issuer`.
    pub fn with_jwt_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.jwt_issuer = Some(issuer.into());
        self
    }

    /// Create a group in the identity directory.
    pub fn with_directory_group(mut self, group: impl Into<String>) -> Self {
        self.directory_groups.push(group.into());
        self
    }

    /// Add a user to the identity directory.
    pub fn with_directory_user(mut self, user_id: impl Into<String>) -> Self {
        self.directory_users.push(user_id.into());
        self
    }

    /// Storage settings for model rows.
    pub fn storage_config(&self) -> StorageConfig {
        let storage = if self.temporary {
            StorageConfig::temporary()
        } else {
            StorageConfig::new(self.data_path.join("storage"))
                .with_flush_every_ms(self.flush_every_ms)
        };
        storage.with_cache_mb(self.cache_mb)
    }

    /// Sled settings for the catalog and key trees.
    pub fn catalog_sled_config(&self) -> sled::Config {
        if self.temporary {
            sled::Config::new().temporary(true)
        } else {
            sled::Config::new()
                .path(self.data_path.join("catalog"))
                .flush_every_ms(self.flush_every_ms)
        }
    }

    /// Check if bearer tokens are accepted.
    pub fn has_jwt(&self) -> bool {
        self.jwt_secret.is_some()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "tuition-server")]
#[command(version, about = "Tuition management backend", long_about = None)]
pub struct Args {
    /// Path to the data directory.
    #[arg(short, long, global = true, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Keep data in memory only.
    #[arg(long, global = true)]
    pub temporary: bool,

    /// Row cache size in megabytes.
    #[arg(long, global = true, default_value_t = DEFAULT_CACHE_MB)]
    pub cache_mb: u64,

    /// Lifetime of issued API keys in days.
    #[arg(long, global = true, default_value_t = DEFAULT_API_KEY_EXPIRY_DAYS)]
    pub api_key_expiry_days: u32,

    /// Referential policy: enforce or allow-dangling.
    #[arg(long, global = true, default_value = "enforce")]
    pub referential_policy: ReferentialPolicy,

    /// Access to models without rules: deny or default-mode.
    #[arg(long, global = true, default_value = "deny")]
    pub unlabeled_access: UnlabeledAccess,

    /// HMAC secret for user-pool tokens.
    #[arg(long, global = true, env = JWT_SECRET_ENV, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Required token issuer.
    #[arg(long, global = true)]
    pub jwt_issuer: Option<String>,

    /// Group to create in the identity directory (repeatable).
    /// Does not grant any permission.
    #[arg(long = "group", global = true)]
    pub groups: Vec<String>,

    /// Directory user (repeatable).
    #[arg(long = "user", global = true)]
    pub users: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the provisioning export of the schema.
    Export {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply the schema to the data directory.
    Provision,
    /// Issue a new API key.
    IssueKey {
        /// Operator note stored with the key.
        #[arg(long)]
        description: Option<String>,
    },
    /// Issue a new API key and revoke all earlier ones.
    RotateKey {
        /// Operator note stored with the key.
        #[arg(long)]
        description: Option<String>,
    },
    /// Serve JSON-lines requests on stdin/stdout.
    Serve,
}

impl Args {
    /// Convert command-line arguments to server configuration.
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig {
            data_path: self.data_path.clone(),
            temporary: self.temporary,
            cache_mb: self.cache_mb,
            flush_every_ms: Some(DEFAULT_FLUSH_EVERY_MS),
            api_key_expiry_days: self.api_key_expiry_days,
            referential_policy: self.referential_policy,
            unlabeled_access: self.unlabeled_access,
            jwt_secret: self.jwt_secret.clone(),
            jwt_issuer: self.jwt_issuer.clone(),
            directory_groups: self.groups.clone(),
            directory_users: self.users.clone(),
        }
    }
}
