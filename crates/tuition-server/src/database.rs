//! Database wrapper combining StorageEngine, Catalog, and the API key store.

use std::sync::Arc;

use tracing::{info, warn};

use tuition_core::catalog::Catalog;
use tuition_core::storage::StorageEngine;
use tuition_core::{tuition, ConstraintValidator, ReferentialPolicy, SchemaBundle};

use crate::auth::ApiKeyAuthenticator;
use crate::config::ServerConfig;
use crate::error::Error;

/// Database wrapper that provides access to storage, catalog, and keys.
pub struct Database {
    storage: StorageEngine,
    catalog: Catalog,
    schema: Arc<SchemaBundle>,
    api_keys: Arc<ApiKeyAuthenticator>,
    referential_policy: ReferentialPolicy,
    /// Keep the sled::Db handle alive for the catalog and key store.
    _catalog_db: sled::Db,
}

impl Database {
    /// Open the database described by `config` and apply the tuition schema.
    pub fn open(config: &ServerConfig) -> Result<Self, Error> {
        let storage_config = config.storage_config();
        if let Some(path) = storage_config.path() {
            std::fs::create_dir_all(path).map_err(|e| {
                Error::Database(format!("failed to create data directory: {}", e))
            })?;
        }
        let storage = StorageEngine::open(storage_config)
            .map_err(|e| Error::Database(format!("failed to open storage: {}", e)))?;

        let catalog_db = config
            .catalog_sled_config()
            .open()
            .map_err(|e| Error::Database(format!("failed to open catalog db: {}", e)))?;

        if storage.was_recovered() {
            info!(path = %config.data_path.display(), "recovered existing data");
        }

        let catalog = Catalog::open(&catalog_db)
            .map_err(|e| Error::Database(format!("failed to open catalog: {}", e)))?;

        let schema = Self::declared_schema(config)?;
        let lifetime = schema.authorization_modes.api_key_lifetime();
        let version = catalog.apply_schema(schema)?;
        let schema = catalog
            .current_schema()
            .ok_or_else(|| Error::Database("schema applied but not readable".to_string()))?;

        if config.referential_policy == ReferentialPolicy::AllowDangling {
            warn!("referential checks disabled, dangling belongs-to references are allowed");
        }
        info!(
            schema_version = version,
            models = schema.entities.len(),
            "schema ready"
        );

        let api_keys = Arc::new(ApiKeyAuthenticator::open(&catalog_db, lifetime)?);

        Ok(Self {
            storage,
            catalog,
            schema,
            api_keys,
            referential_policy: config.referential_policy,
            _catalog_db: catalog_db,
        })
    }

    /// The tuition schema with the configured key lifetime.
    pub fn declared_schema(config: &ServerConfig) -> Result<SchemaBundle, Error> {
        let mut schema = tuition::schema()?;
        schema.authorization_modes.api_key_expires_in_days = config.api_key_expiry_days;
        schema.validate().map_err(tuition_core::Error::from)?;
        Ok(schema)
    }

    /// Get the storage engine.
    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    /// Get the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the active schema.
    pub fn schema(&self) -> &Arc<SchemaBundle> {
        &self.schema
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> u64 {
        self.catalog.current_version()
    }

    /// Get the API key store.
    pub fn api_keys(&self) -> &Arc<ApiKeyAuthenticator> {
        &self.api_keys
    }

    /// Referential policy in force.
    pub fn referential_policy(&self) -> ReferentialPolicy {
        self.referential_policy
    }

    /// Constraint validator over the active schema.
    pub fn validator(&self) -> ConstraintValidator<'_> {
        ConstraintValidator::new(&self.schema, &self.storage, self.referential_policy)
    }

    /// Flush storage and catalog to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.storage.flush()?;
        self.catalog.flush()?;
        Ok(())
    }
}

/// Shared database handle.
pub type SharedDatabase = Arc<Database>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_temporary() {
        let db = Database::open(&ServerConfig::temporary()).unwrap();

        assert_eq!(db.schema_version(), 1);
        assert_eq!(db.schema().entities.len(), 12);
        assert_eq!(db.api_keys().lifetime(), chrono::Duration::days(30));
    }

    /// On-disk config without background flushers, so a dropped handle
    /// releases its lock before the next open.
    fn on_disk(dir: &tempfile::TempDir) -> ServerConfig {
        ServerConfig::new(dir.path()).with_flush_every_ms(None)
    }

    #[test]
    fn test_reopen_keeps_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = on_disk(&dir);

        {
            let db = Database::open(&config).unwrap();
            assert_eq!(db.schema_version(), 1);
            db.flush().unwrap();
        }

        let db = Database::open(&config).unwrap();
        assert_eq!(db.schema_version(), 1);
    }

    #[test]
    fn test_repeated_reopen_acquires_lock() {
        let dir = tempfile::tempdir().unwrap();
        let config = on_disk(&dir);

        for _ in 0..5 {
            let db = Database::open(&config).unwrap();
            assert_eq!(db.schema_version(), 1);
            db.flush().unwrap();
        }
    }

    #[test]
    fn test_key_lifetime_change_is_new_version() {
        let dir = tempfile::tempdir().unwrap();

        {
            let db = Database::open(&on_disk(&dir)).unwrap();
            db.flush().unwrap();
        }

        let db = Database::open(&on_disk(&dir).with_api_key_expiry_days(60)).unwrap();
        assert_eq!(db.schema_version(), 2);
        assert_eq!(db.schema().authorization_modes.api_key_expires_in_days, 60);
    }

    #[test]
    fn test_invalid_key_lifetime_rejected() {
        let config = ServerConfig::temporary().with_api_key_expiry_days(0);
        assert!(Database::open(&config).is_err());
    }
}
