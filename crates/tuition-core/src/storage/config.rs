//! Storage configuration.

use std::path::{Path, PathBuf};

/// Default sled page cache, in megabytes.
pub const DEFAULT_CACHE_MB: u64 = 64;

/// Default background flush interval.
pub const DEFAULT_FLUSH_EVERY_MS: u64 = 500;

/// Where and how rows are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Database directory. `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    pub cache_mb: u64,
    /// Background flush interval; `None` flushes only when asked.
    pub flush_every_ms: Option<u64>,
    pub compression: bool,
}

impl StorageConfig {
    /// On-disk storage under `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            cache_mb: DEFAULT_CACHE_MB,
            flush_every_ms: Some(DEFAULT_FLUSH_EVERY_MS),
            compression: true,
        }
    }

    /// In-memory storage, discarded on drop.
    pub fn temporary() -> Self {
        Self {
            path: None,
            flush_every_ms: None,
            ..Self::new("")
        }
    }

    pub fn with_cache_mb(mut self, megabytes: u64) -> Self {
        self.cache_mb = megabytes.max(1);
        self
    }

    pub fn with_flush_every_ms(mut self, interval: Option<u64>) -> Self {
        self.flush_every_ms = interval;
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Check if rows survive a restart.
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let config = sled::Config::new()
            .cache_capacity(self.cache_mb * 1024 * 1024)
            .use_compression(self.compression)
            .flush_every_ms(self.flush_every_ms);

        match &self.path {
            Some(path) => config.path(path),
            None => config.temporary(true),
        }
    }
}
