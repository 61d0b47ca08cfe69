//! Tuition Core - Schema catalog, constraint validation, and storage.
//!
//! This crate holds the declaration of the tuition-management data model and
//! the machinery that enforces it: typed field coercion, required/enum checks,
//! identifier uniqueness, referential integrity, and access policy evaluation.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod constraint;
pub mod error;
pub mod security;
pub mod storage;
pub mod tuition;
pub mod value;

pub use catalog::{
    AuthMode, AuthRule, AuthorizationModes, Catalog, CustomOperationDef, DefaultValue,
    DeleteBehavior, EntityDef, FieldDef, FieldType, ModelOperation, OperationKind, RelationDef,
    ScalarType, SchemaBundle,
};
pub use constraint::{ConstraintValidator, ReferentialPolicy};
pub use error::{ConstraintError, Error, SchemaError};
pub use storage::{Record, RecordKey, StorageConfig, StorageEngine};
pub use value::{RecordData, Value};

// Security exports
pub use security::{
    AccessPolicy, Principal, SecurityContext, SecurityError, SecurityResult, UnlabeledAccess,
};
