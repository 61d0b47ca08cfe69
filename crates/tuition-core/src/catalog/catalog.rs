//! Persistent record of applied schema bundles.
//!
//! Every distinct declaration gets the next version number. Bundles are kept
//! forever in `catalog:schemas`; `catalog:meta` points at the active one.

use super::SchemaBundle;
use crate::error::Error;
use parking_lot::RwLock;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::sync::Arc;

const SCHEMA_TREE: &str = "catalog:schemas";
const META_TREE: &str = "catalog:meta";
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// Active version and its bundle.
#[derive(Default)]
struct Active {
    version: u64,
    schema: Option<Arc<SchemaBundle>>,
}

/// The catalog of applied schema versions.
pub struct Catalog {
    schemas: Tree,
    meta: Tree,
    active: RwLock<Active>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let catalog = Self {
            schemas: db.open_tree(SCHEMA_TREE)?,
            meta: db.open_tree(META_TREE)?,
            active: RwLock::new(Active::default()),
        };

        if let Some(bytes) = catalog.meta.get(CURRENT_VERSION_KEY)? {
            let version = decode_version(&bytes)?;
            let schema = catalog.schema_at_version(version)?.ok_or_else(|| {
                Error::InvalidData(format!("catalog points at missing schema version {}", version))
            })?;
            *catalog.active.write() = Active {
                version,
                schema: Some(Arc::new(schema)),
            };
        }

        Ok(catalog)
    }

    /// Active schema version. Zero means nothing has been applied.
    pub fn current_version(&self) -> u64 {
        self.active.read().version
    }

    /// Active schema bundle.
    pub fn current_schema(&self) -> Option<Arc<SchemaBundle>> {
        self.active.read().schema.clone()
    }

    /// Bundle stored under `version`.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        self.schemas
            .get(version.to_be_bytes())?
            .map(|bytes| SchemaBundle::from_bytes(&bytes))
            .transpose()
    }

    /// Apply a schema bundle and return the active version.
    ///
    /// Invalid bundles are rejected. A bundle whose declaration equals the
    /// active one is a no-op. Otherwise the bundle and the version pointer
    /// are written in one transaction.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        bundle.validate()?;

        let mut active = self.active.write();
        if let Some(current) = &active.schema {
            if current.same_declaration(&bundle) {
                tracing::debug!(version = active.version, "schema unchanged");
                return Ok(active.version);
            }
        }

        let version = active.version + 1;
        bundle.version = version;
        let encoded = bundle.to_bytes()?;
        let version_key = version.to_be_bytes().to_vec();

        (&self.schemas, &self.meta)
            .transaction(|(schemas, meta)| {
                schemas.insert(version_key.clone(), encoded.clone())?;
                meta.insert(CURRENT_VERSION_KEY, version_key.clone())?;
                Ok::<_, ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(err) => Error::Storage(err),
                TransactionError::Abort(()) => {
                    Error::InvalidData("schema transaction aborted".to_string())
                }
            })?;

        tracing::info!(
            version,
            entities = bundle.entities.len(),
            operations = bundle.operations.len(),
            "schema applied"
        );
        *active = Active {
            version,
            schema: Some(Arc::new(bundle)),
        };
        Ok(version)
    }

    /// Model names in the active schema.
    pub fn list_entities(&self) -> Vec<String> {
        self.current_schema()
            .map(|s| s.entity_names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Every stored version, oldest first.
    pub fn list_versions(&self) -> Result<Vec<u64>, Error> {
        self.schemas
            .iter()
            .keys()
            .map(|key| decode_version(&key?))
            .collect()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.schemas.flush()?;
        self.meta.flush()?;
        Ok(())
    }
}

fn decode_version(bytes: &[u8]) -> Result<u64, Error> {
    let buf: [u8; 8] = bytes.try_into().map_err(|_| Error::InvalidKey)?;
    Ok(u64::from_be_bytes(buf))
}
