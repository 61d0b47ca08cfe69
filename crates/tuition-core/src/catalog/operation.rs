//! Custom operation declarations backed by external function handlers.

use super::authorization::AuthRule;
use super::field::FieldDef;
use super::types::{FieldType, ScalarType};
use rkyv::{Archive, Deserialize, Serialize};

/// Kind of custom operation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// Read-only operation.
    Query,
    /// Operation with side effects.
    Mutation,
}

/// A custom query or mutation.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct CustomOperationDef {
    /// Operation name.
    pub name: String,
    /// Query or mutation.
    pub kind: OperationKind,
    /// Declared arguments.
    pub arguments: Vec<FieldDef>,
    /// Declared return type.
    pub returns: FieldType,
    /// Access rules.
    pub authorization: Vec<AuthRule>,
    /// Name of the function handler invoked for this operation.
    pub handler: String,
}

impl CustomOperationDef {
    /// Declare a mutation. Returns JSON until told otherwise.
    pub fn mutation(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Mutation,
            arguments: Vec::new(),
            returns: FieldType::scalar(ScalarType::Json),
            authorization: Vec::new(),
            handler: String::new(),
        }
    }

    /// Declare a query.
    pub fn query(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Query,
            ..Self::mutation(name)
        }
    }

    /// Set the arguments.
    pub fn arguments(mut self, arguments: impl IntoIterator<Item = FieldDef>) -> Self {
        self.arguments = arguments.into_iter().collect();
        self
    }

    /// Set the return type.
    pub fn returns(mut self, returns: FieldType) -> Self {
        self.returns = returns;
        self
    }

    /// Attach access rules.
    pub fn authorization(mut self, rules: impl IntoIterator<Item = AuthRule>) -> Self {
        self.authorization.extend(rules);
        self
    }

    /// Name the function handler.
    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = handler.into();
        self
    }

    /// Get an argument by name.
    pub fn get_argument(&self, name: &str) -> Option<&FieldDef> {
        self.arguments.iter().find(|a| a.name == name)
    }
}
