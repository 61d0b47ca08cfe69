//! Security module.
//!
//! Security is enforced through a `SecurityContext` that every request
//! carries. The context says how the caller authenticated (shared API key or
//! user-pool identity) and which groups it belongs to. `AccessPolicy`
//! evaluates the rules declared on models and custom operations against it.
//!
//! # Example
//!
//! ```ignore
//! use tuition_core::security::{AccessPolicy, SecurityContext};
//! use tuition_core::catalog::ModelOperation;
//!
//! let schema = tuition_core::tuition::schema()?;
//! let policy = AccessPolicy::new(Default::default(), &schema.authorization_modes);
//! let ctx = SecurityContext::api_key("key-1");
//!
//! policy.authorize_model(&ctx, schema.entity("Todo")?, ModelOperation::Create)?;
//! ```

pub mod context;
pub mod error;
pub mod policy;

pub use context::{Principal, SecurityContext};
pub use error::{SecurityError, SecurityResult};
pub use policy::{AccessPolicy, UnlabeledAccess};
