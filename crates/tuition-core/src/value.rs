//! Typed field values and their JSON representation.

use crate::catalog::{FieldType, ScalarType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A stored row: field name to typed value.
pub type RecordData = BTreeMap<String, Value>;

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Value {
    /// Explicit null.
    Null,
    /// String value.
    String(String),
    /// Identifier value.
    Id(String),
    /// Floating point value.
    Float(f64),
    /// Integer value.
    Integer(i64),
    /// Calendar date.
    Date(NaiveDate),
    /// Enum literal.
    Enum(String),
}

/// Why a JSON value could not be coerced to a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum CoerceError {
    /// The JSON kind does not fit the declared type.
    TypeMismatch {
        /// Declared type.
        expected: String,
        /// Description of the provided value.
        found: String,
    },
    /// The literal is not in the enum's declared set.
    NotInEnum(String),
}

impl Value {
    /// Coerce a JSON value into the declared field type.
    ///
    /// JSON `null` always coerces to `Value::Null`; required-ness is checked
    /// by the caller.
    pub fn coerce(field_type: &FieldType, json: &serde_json::Value) -> Result<Value, CoerceError> {
        if json.is_null() {
            return Ok(Value::Null);
        }

        let mismatch = || CoerceError::TypeMismatch {
            expected: field_type.describe(),
            found: json_kind(json).to_string(),
        };

        match field_type {
            FieldType::Enum { .. } => {
                let literal = json.as_str().ok_or_else(mismatch)?;
                if field_type.accepts_literal(literal) {
                    Ok(Value::Enum(literal.to_string()))
                } else {
                    Err(CoerceError::NotInEnum(literal.to_string()))
                }
            }
            FieldType::Scalar { scalar } => match scalar {
                ScalarType::String => json
                    .as_str()
                    .map(|s| Value::String(s.to_string()))
                    .ok_or_else(mismatch),
                ScalarType::Id => match json.as_str() {
                    Some(s) if !s.is_empty() => Ok(Value::Id(s.to_string())),
                    _ => Err(mismatch()),
                },
                ScalarType::Float => json.as_f64().map(Value::Float).ok_or_else(mismatch),
                ScalarType::Integer => json.as_i64().map(Value::Integer).ok_or_else(mismatch),
                ScalarType::Date => json
                    .as_str()
                    .and_then(|s| s.parse::<NaiveDate>().ok())
                    .map(Value::Date)
                    .ok_or_else(mismatch),
                ScalarType::Json => Err(mismatch()),
            },
        }
    }

    /// Render as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::String(s) | Value::Id(s) | Value::Enum(s) => serde_json::Value::String(s.clone()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Check for null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String content of string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Id(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) | Value::Id(s) | Value::Enum(s) => write!(f, "{}", s),
            Value::Float(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Render a row as a JSON object.
pub fn record_to_json(data: &RecordData) -> serde_json::Map<String, serde_json::Value> {
    data.iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "float",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
