//! Storage engine implementation.

use super::{Record, RecordKey, StorageConfig};
use crate::error::{ConstraintError, Error};
use sled::{Db, Tree};
use std::ops::Bound;

/// Prefix for per-entity data trees.
const DATA_TREE_PREFIX: &str = "data:";

/// The storage engine wrapping sled. Each entity lives in its own tree, keyed
/// by the encoded identifier.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        Ok(Self { db })
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    fn tree(&self, entity: &str) -> Result<Tree, Error> {
        Ok(self.db.open_tree(format!("{}{}", DATA_TREE_PREFIX, entity))?)
    }

    /// Insert a new row. Fails with `DuplicateIdentifier` if the key is taken.
    ///
    /// The check and the write are a single compare-and-swap, so two
    /// concurrent inserts of the same identifier cannot both succeed.
    pub fn insert(&self, entity: &str, key: &RecordKey, record: &Record) -> Result<(), Error> {
        let tree = self.tree(entity)?;
        let value = record.to_bytes()?;

        match tree.compare_and_swap(key.encode(), None as Option<&[u8]>, Some(value))? {
            Ok(()) => Ok(()),
            Err(_) => Err(ConstraintError::DuplicateIdentifier {
                entity: entity.to_string(),
                key: key.to_string(),
            }
            .into()),
        }
    }

    /// Overwrite an existing row. Fails with `NotFound` if it does not exist.
    pub fn replace(&self, entity: &str, key: &RecordKey, record: &Record) -> Result<(), Error> {
        let tree = self.tree(entity)?;
        let encoded = key.encode();
        if !tree.contains_key(&encoded)? {
            return Err(Error::NotFound);
        }
        tree.insert(encoded, record.to_bytes()?)?;
        Ok(())
    }

    /// Get a row by key.
    pub fn get(&self, entity: &str, key: &RecordKey) -> Result<Option<Record>, Error> {
        match self.tree(entity)?.get(key.encode())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check whether a row exists.
    pub fn contains(&self, entity: &str, key: &RecordKey) -> Result<bool, Error> {
        Ok(self.tree(entity)?.contains_key(key.encode())?)
    }

    /// Remove a row, returning what was stored.
    pub fn remove(&self, entity: &str, key: &RecordKey) -> Result<Option<Record>, Error> {
        match self.tree(entity)?.remove(key.encode())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan all rows of an entity in key order.
    pub fn scan(
        &self,
        entity: &str,
    ) -> Result<impl Iterator<Item = Result<(RecordKey, Record), Error>>, Error> {
        self.scan_after(entity, None)
    }

    /// Scan rows strictly after `after` in key order.
    pub fn scan_after(
        &self,
        entity: &str,
        after: Option<&RecordKey>,
    ) -> Result<impl Iterator<Item = Result<(RecordKey, Record), Error>>, Error> {
        let tree = self.tree(entity)?;
        let lower = match after {
            Some(key) => Bound::Excluded(key.encode()),
            None => Bound::Unbounded,
        };

        Ok(tree
            .range::<Vec<u8>, _>((lower, Bound::Unbounded))
            .map(|result| {
                let (key_bytes, value_bytes) = result?;
                let key = RecordKey::decode(&key_bytes).ok_or(Error::InvalidKey)?;
                let record = Record::from_bytes(&value_bytes)?;
                Ok((key, record))
            }))
    }

    /// Number of rows stored for an entity.
    pub fn count(&self, entity: &str) -> Result<usize, Error> {
        Ok(self.tree(entity)?.len())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Generate a new identifier (hyphenated 128-bit hex).
    ///
    /// Combines the nanosecond clock with a process-wide counter, so values
    /// are unique within a process and roughly time-ordered.
    pub fn generate_id() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default() as u64;
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&now.to_be_bytes());
        id[8..].copy_from_slice(&counter.to_be_bytes());

        let hex = hex::encode(id);
        format!(
            "{}-{}-{}-{}-{}",
            &hex[..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..]
        )
    }

    /// Get a reference to the underlying sled database.
    pub fn db(&self) -> &Db {
        &self.db
    }
}
