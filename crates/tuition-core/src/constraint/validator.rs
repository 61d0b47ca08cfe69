//! Constraint validation logic.
//!
//! The ConstraintValidator turns raw JSON input into typed rows and checks
//! every declared constraint for an entity during create, update, and delete.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};

use crate::catalog::{DefaultValue, DeleteBehavior, EntityDef, FieldDef, FieldType, SchemaBundle};
use crate::error::{ConstraintError, Error};
use crate::storage::{Record, RecordKey, StorageEngine};
use crate::value::{CoerceError, RecordData, Value};

/// How belongs-to edges are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialPolicy {
    /// Foreign keys must resolve on write, and referenced rows cannot be deleted.
    #[default]
    Enforce,
    /// Foreign keys are stored as given; dangling references are allowed.
    AllowDangling,
}

impl FromStr for ReferentialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enforce" => Ok(ReferentialPolicy::Enforce),
            "allow-dangling" => Ok(ReferentialPolicy::AllowDangling),
            other => Err(format!(
                "unknown referential policy '{}' (expected enforce or allow-dangling)",
                other
            )),
        }
    }
}

impl fmt::Display for ReferentialPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferentialPolicy::Enforce => write!(f, "enforce"),
            ReferentialPolicy::AllowDangling => write!(f, "allow-dangling"),
        }
    }
}

/// Constraint validator for enforcing the declared model.
pub struct ConstraintValidator<'a> {
    schema: &'a SchemaBundle,
    engine: &'a StorageEngine,
    policy: ReferentialPolicy,
}

impl<'a> ConstraintValidator<'a> {
    /// Create a new constraint validator.
    pub fn new(
        schema: &'a SchemaBundle,
        engine: &'a StorageEngine,
        policy: ReferentialPolicy,
    ) -> Self {
        Self {
            schema,
            engine,
            policy,
        }
    }

    /// Build a new row from create input.
    ///
    /// Checks:
    /// - every input field is declared and has the declared type
    /// - enum fields hold one of their literals
    /// - defaults fill absent fields (`today` for date defaults)
    /// - required fields are present and non-null
    /// - foreign keys resolve (under `ReferentialPolicy::Enforce`)
    ///
    /// Identifier uniqueness is checked by the storage insert itself.
    pub fn prepare_create(
        &self,
        entity: &str,
        input: &Map<String, JsonValue>,
        today: NaiveDate,
    ) -> Result<(RecordKey, RecordData), Error> {
        let def = self.schema.entity(entity)?;
        let mut data = coerce_input(def, input)?;

        for field in &def.fields {
            let absent = data.get(&field.name).map_or(true, Value::is_null);
            if !absent {
                continue;
            }
            if let Some(default) = &field.default {
                data.insert(field.name.clone(), default_value(def, field, default, today)?);
            }
        }

        check_required(def, &data)?;
        data.retain(|_, value| !value.is_null());

        for relation in &def.relations {
            self.check_foreign_key(def, &relation.name, &data)?;
        }

        let key = key_from_data(def, &data)?;
        Ok((key, data))
    }

    /// Merge an update patch into an existing row.
    ///
    /// Fields absent from the patch keep their stored value. A `null` clears
    /// an optional field; nulling a required field is rejected. Identifier
    /// fields may be repeated but not changed. Only foreign keys touched by
    /// the patch are rechecked.
    pub fn prepare_update(
        &self,
        entity: &str,
        key: &RecordKey,
        patch: &Map<String, JsonValue>,
    ) -> Result<(Record, RecordData), Error> {
        let def = self.schema.entity(entity)?;
        let existing = self.engine.get(entity, key)?.ok_or(Error::NotFound)?;
        let mut data = existing.decode_data()?;
        let changes = coerce_input(def, patch)?;

        for (name, value) in &changes {
            if def.is_identifier(name) && data.get(name) != Some(value) {
                return Err(ConstraintError::IdentifierChange {
                    entity: def.name.clone(),
                    field: name.clone(),
                }
                .into());
            }
        }

        for (name, value) in changes.iter() {
            if value.is_null() {
                data.remove(name);
            } else {
                data.insert(name.clone(), value.clone());
            }
        }
        check_required(def, &data)?;

        for relation in &def.relations {
            if changes.contains_key(&relation.foreign_key) {
                self.check_foreign_key(def, &relation.name, &data)?;
            }
        }

        Ok((existing, data))
    }

    /// Validate that a delete is allowed.
    ///
    /// Under `ReferentialPolicy::Enforce`, a row that is still the target of
    /// a `Restrict` belongs-to edge cannot be deleted.
    pub fn validate_delete(&self, entity: &str, key: &RecordKey) -> Result<(), Error> {
        self.schema.entity(entity)?;
        if self.policy == ReferentialPolicy::AllowDangling {
            return Ok(());
        }

        let target = match key.values() {
            [single] => single.as_str(),
            _ => return Ok(()),
        };

        for relation in self.schema.relations_to(entity) {
            if relation.on_delete != DeleteBehavior::Restrict {
                continue;
            }

            let mut count = 0;
            for row in self.engine.scan(&relation.from_entity)? {
                let (_, record) = row?;
                let data = record.decode_data()?;
                if data.get(&relation.foreign_key).and_then(Value::as_str) == Some(target) {
                    count += 1;
                }
            }

            if count > 0 {
                return Err(ConstraintError::RestrictViolation {
                    relation: relation.qualified_name(),
                    entity: entity.to_string(),
                    key: key.to_string(),
                    referencing_entity: relation.from_entity.clone(),
                    count,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Build a row key from identifier values supplied as JSON.
    pub fn key_from_json(&self, entity: &str, input: &Map<String, JsonValue>) -> Result<RecordKey, Error> {
        let def = self.schema.entity(entity)?;
        let mut values = Vec::with_capacity(def.identifier.len());

        for field in def.identifier_fields() {
            let value = match input.get(&field.name) {
                Some(json) => coerce_field(def, field, json)?,
                None => Value::Null,
            };
            if value.is_null() {
                return Err(missing(def, &field.name).into());
            }
            values.push(value.to_string());
        }

        Ok(RecordKey::new(values))
    }

    fn check_foreign_key(
        &self,
        def: &EntityDef,
        relation: &str,
        data: &RecordData,
    ) -> Result<(), Error> {
        if self.policy == ReferentialPolicy::AllowDangling {
            return Ok(());
        }
        let Some(relation) = def.get_relation(relation) else {
            return Ok(());
        };
        let Some(value) = data.get(&relation.foreign_key).and_then(Value::as_str) else {
            return Ok(());
        };

        if !self.engine.contains(&relation.to_entity, &RecordKey::new([value]))? {
            return Err(ConstraintError::ForeignKeyViolation {
                relation: relation.qualified_name(),
                entity: def.name.clone(),
                field: relation.foreign_key.clone(),
                referenced_entity: relation.to_entity.clone(),
                value: value.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Build a row key from a typed row.
pub fn key_from_data(def: &EntityDef, data: &RecordData) -> Result<RecordKey, Error> {
    let values = def
        .identifier
        .iter()
        .map(|name| match data.get(name) {
            Some(value) if !value.is_null() => Ok(value.to_string()),
            _ => Err(missing(def, name)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordKey::new(values))
}

fn coerce_input(def: &EntityDef, input: &Map<String, JsonValue>) -> Result<RecordData, ConstraintError> {
    let mut data = RecordData::new();
    for (name, json) in input {
        let field = def
            .get_field(name)
            .ok_or_else(|| ConstraintError::UnknownField {
                entity: def.name.clone(),
                field: name.clone(),
            })?;
        data.insert(name.clone(), coerce_field(def, field, json)?);
    }
    Ok(data)
}

fn coerce_field(def: &EntityDef, field: &FieldDef, json: &JsonValue) -> Result<Value, ConstraintError> {
    Value::coerce(&field.field_type, json).map_err(|err| match err {
        CoerceError::TypeMismatch { expected, found } => ConstraintError::TypeMismatch {
            entity: def.name.clone(),
            field: field.name.clone(),
            expected,
            found,
        },
        CoerceError::NotInEnum(value) => ConstraintError::InvalidEnumValue {
            entity: def.name.clone(),
            field: field.name.clone(),
            value,
            allowed: match &field.field_type {
                FieldType::Enum { variants, .. } => variants.clone(),
                FieldType::Scalar { .. } => Vec::new(),
            },
        },
    })
}

fn default_value(
    def: &EntityDef,
    field: &FieldDef,
    default: &DefaultValue,
    today: NaiveDate,
) -> Result<Value, ConstraintError> {
    match default {
        DefaultValue::CurrentDate => Ok(Value::Date(today)),
        DefaultValue::AutoId => Ok(Value::Id(StorageEngine::generate_id())),
        DefaultValue::String(s) => coerce_field(def, field, &JsonValue::from(s.as_str())),
        DefaultValue::Int(i) => coerce_field(def, field, &JsonValue::from(*i)),
        DefaultValue::Float(f) => coerce_field(def, field, &JsonValue::from(*f)),
    }
}

fn check_required(def: &EntityDef, data: &RecordData) -> Result<(), ConstraintError> {
    for field in def.required_fields() {
        if data.get(&field.name).map_or(true, Value::is_null) {
            return Err(missing(def, &field.name));
        }
    }
    Ok(())
}

fn missing(def: &EntityDef, field: &str) -> ConstraintError {
    ConstraintError::MissingRequired {
        entity: def.name.clone(),
        field: field.to_string(),
    }
}
