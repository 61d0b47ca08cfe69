//! Storage layer.
//!
//! One sled tree per entity, rows addressed by their declared identifier.

mod config;
mod engine;
mod record;

pub mod key;

pub use config::{StorageConfig, DEFAULT_CACHE_MB, DEFAULT_FLUSH_EVERY_MS};
pub use engine::StorageEngine;
pub use key::RecordKey;
pub use record::Record;
