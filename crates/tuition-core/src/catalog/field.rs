//! Field definitions for entities.

use super::types::{FieldType, ScalarType};
use rkyv::{Archive, Deserialize, Serialize};

/// A field definition within an entity.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether the field must be present and non-null on every row.
    pub required: bool,
    /// Default value applied when the field is omitted on create.
    pub default: Option<DefaultValue>,
}

/// Default value for a field.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum DefaultValue {
    /// String literal.
    String(String),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// The calendar date at creation time (UTC).
    CurrentDate,
    /// Auto-generated identifier.
    AutoId,
}

impl FieldDef {
    /// Create an optional field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
        }
    }

    /// Optional string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::scalar(ScalarType::String))
    }

    /// Optional id field.
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::scalar(ScalarType::Id))
    }

    /// Optional float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::scalar(ScalarType::Float))
    }

    /// Optional integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::scalar(ScalarType::Integer))
    }

    /// Optional date field.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::scalar(ScalarType::Date))
    }

    /// Optional enum field. The enum type is named after its owner and field.
    pub fn enumeration<I, S>(name: impl Into<String>, enum_name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldType::enum_type(enum_name, variants))
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Check if this field has a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Check if this field is an id scalar.
    pub fn is_id(&self) -> bool {
        self.field_type.scalar_type() == Some(ScalarType::Id)
    }
}
