//! Schema bundle - versioned, immutable snapshot of the entire declaration.

use super::{AuthRule, AuthorizationModes, CustomOperationDef, EntityDef, FieldDef, FieldType, RelationDef};
use crate::error::{Error, SchemaError};
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Maximum API key lifetime accepted by `validate`, in days.
pub const MAX_API_KEY_EXPIRY_DAYS: u32 = 365;

/// A versioned snapshot of the entire schema.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing, assigned by the catalog).
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Entity definitions keyed by name.
    pub entities: BTreeMap<String, EntityDef>,
    /// Custom operations keyed by name.
    pub operations: BTreeMap<String, CustomOperationDef>,
    /// Authorization mode settings.
    pub authorization_modes: AuthorizationModes,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: crate::storage::key::current_timestamp(),
            entities: BTreeMap::new(),
            operations: BTreeMap::new(),
            authorization_modes: AuthorizationModes::default(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a custom operation to the schema.
    pub fn with_operation(mut self, operation: CustomOperationDef) -> Self {
        self.operations.insert(operation.name.clone(), operation);
        self
    }

    /// Set the authorization modes.
    pub fn with_authorization_modes(mut self, modes: AuthorizationModes) -> Self {
        self.authorization_modes = modes;
        self
    }

    /// Validate the declaration and hand it back, ready to share.
    pub fn build(self) -> Result<Self, Error> {
        self.validate()?;
        Ok(self)
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get an entity by name or fail with `UnknownModel`.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, Error> {
        self.get_entity(name)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Get a custom operation by name.
    pub fn get_operation(&self, name: &str) -> Option<&CustomOperationDef> {
        self.operations.get(name)
    }

    /// Get all relations owned by an entity.
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.entities
            .get(entity)
            .map(|e| e.relations.iter().collect())
            .unwrap_or_default()
    }

    /// Get all relations targeting an entity, across the schema.
    pub fn relations_to(&self, entity: &str) -> Vec<&RelationDef> {
        self.entities
            .values()
            .flat_map(|e| e.relations.iter())
            .filter(|r| r.to_entity == entity)
            .collect()
    }

    /// List all entity names, in name order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Compare declarations, ignoring version and creation time.
    pub fn same_declaration(&self, other: &SchemaBundle) -> bool {
        self.entities == other.entities
            && self.operations == other.operations
            && self.authorization_modes == other.authorization_modes
    }

    /// Check the declaration for internal consistency.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for entity in self.entities.values() {
            self.validate_entity(entity)?;
        }

        for op in self.operations.values() {
            if op.handler.is_empty() {
                return Err(SchemaError::MissingHandler(op.name.clone()));
            }
            if self.entities.contains_key(&op.name) {
                return Err(SchemaError::OperationShadowsModel(op.name.clone()));
            }
            validate_fields(&op.name, &op.arguments)?;
            validate_rules(&op.name, &op.authorization)?;
        }

        let days = self.authorization_modes.api_key_expires_in_days;
        if days == 0 || days > MAX_API_KEY_EXPIRY_DAYS {
            return Err(SchemaError::InvalidApiKeyExpiry(days));
        }

        Ok(())
    }

    fn validate_entity(&self, entity: &EntityDef) -> Result<(), SchemaError> {
        validate_fields(&entity.name, &entity.fields)?;

        if entity.identifier.is_empty() {
            return Err(SchemaError::EmptyIdentifier(entity.name.clone()));
        }
        for name in &entity.identifier {
            let field = entity
                .get_field(name)
                .ok_or_else(|| SchemaError::UnknownIdentifierField {
                    entity: entity.name.clone(),
                    field: name.clone(),
                })?;
            if !field.required {
                return Err(SchemaError::OptionalIdentifier {
                    entity: entity.name.clone(),
                    field: name.clone(),
                });
            }
        }

        for relation in &entity.relations {
            if entity.get_field(&relation.name).is_some() {
                return Err(SchemaError::RelationShadowsField {
                    entity: entity.name.clone(),
                    relation: relation.name.clone(),
                });
            }

            let target = self.entities.get(&relation.to_entity).ok_or_else(|| {
                SchemaError::UnknownRelationTarget {
                    entity: entity.name.clone(),
                    relation: relation.name.clone(),
                    target: relation.to_entity.clone(),
                }
            })?;
            if target.identifier.len() != 1 {
                return Err(SchemaError::CompositeRelationTarget {
                    entity: entity.name.clone(),
                    relation: relation.name.clone(),
                    target: target.name.clone(),
                });
            }

            match entity.get_field(&relation.foreign_key) {
                Some(fk) if fk.is_id() => {}
                _ => {
                    return Err(SchemaError::InvalidForeignKey {
                        entity: entity.name.clone(),
                        relation: relation.name.clone(),
                        field: relation.foreign_key.clone(),
                    })
                }
            }
        }

        validate_rules(&entity.name, &entity.authorization)
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // sled values carry no alignment guarantee
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Render the provisioning artifact as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}

fn validate_fields(owner: &str, fields: &[FieldDef]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                entity: owner.to_string(),
                field: field.name.clone(),
            });
        }
        if let FieldType::Enum { name, variants } = &field.field_type {
            let distinct: HashSet<&str> = variants.iter().map(|v| v.as_str()).collect();
            if variants.is_empty() || distinct.len() != variants.len() {
                return Err(SchemaError::InvalidEnum { name: name.clone() });
            }
        }
    }
    Ok(())
}

fn validate_rules(owner: &str, rules: &[AuthRule]) -> Result<(), SchemaError> {
    for rule in rules {
        if let AuthRule::Group { group, .. } = rule {
            if group.trim().is_empty() {
                return Err(SchemaError::EmptyGroup {
                    owner: owner.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldDef;

    fn sample_schema() -> SchemaBundle {
        let owner = EntityDef::model("owner")
            .field(FieldDef::id("ownerId").required())
            .field(FieldDef::string("name"))
            .identifier(["ownerId"]);

        let pet = EntityDef::model("pet")
            .field(FieldDef::id("petId").required())
            .field(FieldDef::id("ownerId").required())
            .belongs_to("owner", "owner", "ownerId")
            .identifier(["petId"]);

        let op = CustomOperationDef::mutation("adopt")
            .arguments([FieldDef::string("petId").required()])
            .authorization([AuthRule::group("STAFF")])
            .handler("adopt");

        SchemaBundle::new(1)
            .with_entity(owner)
            .with_entity(pet)
            .with_operation(op)
    }

    #[test]
    fn test_schema_bundle_builder() {
        let schema = sample_schema().build().unwrap();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.operations.len(), 1);
        assert_eq!(schema.entity_names(), vec!["owner", "pet"]);
    }

    #[test]
    fn test_relations_for_entity() {
        let schema = sample_schema();

        assert_eq!(schema.relations_from("pet").len(), 1);
        assert_eq!(schema.relations_to("owner").len(), 1);
        assert!(schema.relations_to("pet").is_empty());
    }

    #[test]
    fn test_unknown_relation_target() {
        let schema = sample_schema().with_entity(
            EntityDef::model("toy")
                .field(FieldDef::id("vetId").required())
                .belongs_to("vet", "vet", "vetId"),
        );

        assert!(matches!(
            schema.validate(),
            Err(SchemaError::UnknownRelationTarget { ref target, .. }) if target == "vet"
        ));
    }

    #[test]
    fn test_foreign_key_must_be_id() {
        let schema = sample_schema().with_entity(
            EntityDef::model("toy")
                .field(FieldDef::string("ownerName"))
                .belongs_to("owner", "owner", "ownerName"),
        );

        assert!(matches!(
            schema.validate(),
            Err(SchemaError::InvalidForeignKey { .. })
        ));
    }

    #[test]
    fn test_optional_identifier_rejected() {
        let schema = SchemaBundle::new(1).with_entity(
            EntityDef::model("loose")
                .field(FieldDef::id("looseId"))
                .identifier(["looseId"]),
        );

        assert!(matches!(
            schema.validate(),
            Err(SchemaError::OptionalIdentifier { .. })
        ));
    }

    #[test]
    fn test_duplicate_enum_literal_rejected() {
        let schema = SchemaBundle::new(1).with_entity(
            EntityDef::model("thing").field(FieldDef::enumeration(
                "status",
                "ThingStatus",
                ["on", "on"],
            )),
        );

        assert_eq!(
            schema.validate(),
            Err(SchemaError::InvalidEnum {
                name: "ThingStatus".into()
            })
        );
    }

    #[test]
    fn test_operation_without_handler_rejected() {
        let schema = sample_schema().with_operation(CustomOperationDef::mutation("orphan"));
        assert_eq!(
            schema.validate(),
            Err(SchemaError::MissingHandler("orphan".into()))
        );
    }

    #[test]
    fn test_api_key_expiry_bounds() {
        let mut modes = AuthorizationModes::default();
        modes.api_key_expires_in_days = 0;
        let schema = sample_schema().with_authorization_modes(modes);

        assert_eq!(schema.validate(), Err(SchemaError::InvalidApiKeyExpiry(0)));
    }

    #[test]
    fn test_same_declaration_ignores_version() {
        let a = sample_schema();
        let mut b = sample_schema();
        b.version = 7;
        b.created_at = 0;

        assert!(a.same_declaration(&b));
        assert!(!a.same_declaration(&SchemaBundle::new(1)));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let schema = sample_schema();
        let bytes = schema.to_bytes().unwrap();
        let decoded = SchemaBundle::from_bytes(&bytes).unwrap();

        assert_eq!(schema, decoded);
    }

    #[test]
    fn test_json_export_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_schema().to_json().unwrap()).unwrap();

        assert_eq!(json["entities"]["pet"]["identifier"][0], "petId");
        assert_eq!(
            json["entities"]["pet"]["relations"][0]["foreignKey"],
            "ownerId"
        );
        assert_eq!(json["operations"]["adopt"]["kind"], "mutation");
        assert_eq!(json["authorizationModes"]["apiKeyExpiresInDays"], 30);
    }
}
