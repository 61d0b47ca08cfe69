//! Schema catalog.
//!
//! Declares the shape of every model (fields, identifiers, belongs-to
//! relations, access rules) and custom operations, and persists applied
//! schema versions.

mod authorization;
mod catalog;
mod entity;
mod field;
mod operation;
mod relation;
mod schema;
mod types;

pub use authorization::{
    AuthMode, AuthRule, AuthorizationModes, ModelOperation, DEFAULT_API_KEY_EXPIRY_DAYS,
};
pub use catalog::Catalog;
pub use entity::{EntityDef, IMPLICIT_ID_FIELD};
pub use field::{DefaultValue, FieldDef};
pub use operation::{CustomOperationDef, OperationKind};
pub use relation::{DeleteBehavior, RelationDef};
pub use schema::{SchemaBundle, MAX_API_KEY_EXPIRY_DAYS};
pub use types::{FieldType, ScalarType};
