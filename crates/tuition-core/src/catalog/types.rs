//! Core type definitions for the catalog.

use rkyv::{Archive, Deserialize, Serialize};

/// Primitive field types a model may declare.
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
pub enum ScalarType {
    /// UTF-8 string.
    String,
    /// Opaque identifier (string-encoded).
    Id,
    /// 64-bit floating point.
    Float,
    /// 64-bit signed integer.
    Integer,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Untyped JSON document. Only valid as a custom operation return type.
    Json,
}

/// Field types - a scalar or an enumeration of string literals.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FieldType {
    /// A scalar value.
    Scalar {
        /// Scalar kind.
        scalar: ScalarType,
    },
    /// An enumeration type.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed literal values, exactly as declared.
        variants: Vec<String>,
    },
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Integer)
    }

    /// Name used in error messages and the provisioning export.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Id => "id",
            ScalarType::Float => "float",
            ScalarType::Integer => "integer",
            ScalarType::Date => "date",
            ScalarType::Json => "json",
        }
    }
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar { scalar }
    }

    /// Create an enum field type.
    pub fn enum_type<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the inner scalar type if this is a scalar.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar { scalar } => Some(*scalar),
            FieldType::Enum { .. } => None,
        }
    }

    /// Check whether an enum type accepts the literal. Scalars never do.
    pub fn accepts_literal(&self, literal: &str) -> bool {
        match self {
            FieldType::Enum { variants, .. } => variants.iter().any(|v| v == literal),
            FieldType::Scalar { .. } => false,
        }
    }

    /// Human-readable type description.
    pub fn describe(&self) -> String {
        match self {
            FieldType::Scalar { scalar } => scalar.type_name().to_string(),
            FieldType::Enum { name, .. } => format!("enum {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_checks() {
        assert!(ScalarType::Float.is_numeric());
        assert!(ScalarType::Integer.is_numeric());
        assert!(!ScalarType::String.is_numeric());
        assert!(!ScalarType::Date.is_numeric());
        assert_eq!(ScalarType::Id.type_name(), "id");
    }

    #[test]
    fn test_enum_literals_are_exact() {
        let status = FieldType::enum_type("ProfessorStatus", ["active", "suspende", "inactive"]);

        assert!(status.accepts_literal("suspende"));
        assert!(!status.accepts_literal("suspended"));
        assert!(!status.accepts_literal("Active"));
        assert!(status.scalar_type().is_none());
        assert_eq!(status.describe(), "enum ProfessorStatus");
    }

    #[test]
    fn test_scalar_never_accepts_literal() {
        let text = FieldType::scalar(ScalarType::String);
        assert!(!text.accepts_literal("anything"));
        assert_eq!(text.scalar_type(), Some(ScalarType::String));
    }
}
