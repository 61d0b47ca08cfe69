//! Constraint enforcement module.
//!
//! This module turns write input into typed rows and enforces the declared model:
//! - Field types, enum literals, and required fields
//! - Defaults (current date, generated ids)
//! - Identifier immutability on update
//! - Belongs-to references (existence on write, restrict on delete)
//!
//! Identifier uniqueness is enforced by `StorageEngine::insert`.

mod validator;

pub use validator::{key_from_data, ConstraintValidator, ReferentialPolicy};
