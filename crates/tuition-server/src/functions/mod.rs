//! Function handlers backing custom operations.
//!
//! A custom operation names its handler; the registry maps that name to an
//! implementation. Arguments are checked against the operation's declared
//! argument list before the handler runs.

mod add_user_to_group;

pub use add_user_to_group::{AddUserToGroup, IdentityDirectory, MemoryDirectory};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use tuition_core::error::{ConstraintError, Error as CoreError, SchemaError};
use tuition_core::security::SecurityContext;
use tuition_core::{CustomOperationDef, SchemaBundle, Value};

/// Failures reported by function handlers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    /// The identity service does not know the user.
    #[error("user {0} does not exist")]
    UnknownUser(String),

    /// The identity service does not know the group.
    #[error("group {0} does not exist")]
    UnknownGroup(String),

    /// Arguments passed validation but the handler cannot use them.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A handler for a custom operation.
pub trait FunctionHandler: Send + Sync {
    /// Name the schema uses to refer to this handler.
    fn name(&self) -> &str;

    /// Run the handler with already validated arguments.
    fn invoke(
        &self,
        caller: &SecurityContext,
        arguments: &Map<String, JsonValue>,
    ) -> Result<JsonValue, FunctionError>;
}

/// Handlers keyed by name.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    handlers: BTreeMap<String, Arc<dyn FunctionHandler>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own name, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn FunctionHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// Builder form of `register`.
    pub fn with_handler(mut self, handler: Arc<dyn FunctionHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Look up a handler.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FunctionHandler>> {
        self.handlers.get(name)
    }

    /// Registered handler names.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Check that every operation in the schema has a registered handler.
    pub fn check_schema(&self, schema: &SchemaBundle) -> Result<(), CoreError> {
        for op in schema.operations.values() {
            if !self.handlers.contains_key(&op.handler) {
                return Err(SchemaError::MissingHandler(op.name.clone()).into());
            }
        }
        Ok(())
    }
}

/// Check arguments against an operation's declaration.
///
/// Unknown arguments, type mismatches, and missing required arguments are
/// rejected the same way model writes are.
pub fn validate_arguments(
    op: &CustomOperationDef,
    arguments: &Map<String, JsonValue>,
) -> Result<(), CoreError> {
    for (name, json) in arguments {
        let arg = op.get_argument(name).ok_or_else(|| ConstraintError::UnknownField {
            entity: op.name.clone(),
            field: name.clone(),
        })?;
        Value::coerce(&arg.field_type, json).map_err(|_| ConstraintError::TypeMismatch {
            entity: op.name.clone(),
            field: name.clone(),
            expected: arg.field_type.describe(),
            found: json.to_string(),
        })?;
    }

    for arg in op.arguments.iter().filter(|a| a.required) {
        if arguments.get(&arg.name).map_or(true, JsonValue::is_null) {
            return Err(ConstraintError::MissingRequired {
                entity: op.name.clone(),
                field: arg.name.clone(),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tuition_core::tuition;

    struct Echo;

    impl FunctionHandler for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn invoke(
            &self,
            _caller: &SecurityContext,
            arguments: &Map<String, JsonValue>,
        ) -> Result<JsonValue, FunctionError> {
            Ok(JsonValue::Object(arguments.clone()))
        }
    }

    fn args(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_registry_lookup() {
        let registry = FunctionRegistry::new().with_handler(Arc::new(Echo));

        assert_eq!(registry.names(), vec!["echo"]);
        let out = registry
            .get("echo")
            .unwrap()
            .invoke(&SecurityContext::anonymous(), &args(json!({"a": 1})))
            .unwrap();
        assert_eq!(out, json!({"a": 1}));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_check_schema_requires_handlers() {
        let schema = tuition::schema().unwrap();

        let err = FunctionRegistry::new().check_schema(&schema).unwrap_err();
        assert!(matches!(err, CoreError::Schema(SchemaError::MissingHandler(_))));

        let registry = FunctionRegistry::new()
            .with_handler(Arc::new(AddUserToGroup::new(Arc::new(MemoryDirectory::new()))));
        assert!(registry.check_schema(&schema).is_ok());
    }

    #[test]
    fn test_validate_arguments() {
        let schema = tuition::schema().unwrap();
        let op = schema.get_operation(tuition::ADD_USER_TO_GROUP).unwrap();

        assert!(validate_arguments(op, &args(json!({"userId": "u1", "groupName": "ADMINS"}))).is_ok());

        assert!(matches!(
            validate_arguments(op, &args(json!({"userId": "u1"}))),
            Err(CoreError::ConstraintViolation(ConstraintError::MissingRequired { .. }))
        ));
        assert!(matches!(
            validate_arguments(op, &args(json!({"userId": 5, "groupName": "ADMINS"}))),
            Err(CoreError::ConstraintViolation(ConstraintError::TypeMismatch { .. }))
        ));
        assert!(matches!(
            validate_arguments(
                op,
                &args(json!({"userId": "u1", "groupName": "ADMINS", "role": "x"}))
            ),
            Err(CoreError::ConstraintViolation(ConstraintError::UnknownField { .. }))
        ));
    }
}
