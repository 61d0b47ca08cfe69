//! Entity (model) definitions.

use super::authorization::AuthRule;
use super::field::{DefaultValue, FieldDef};
use super::relation::RelationDef;
use rkyv::{Archive, Deserialize, Serialize};

/// Name of the identifier field added to models that do not declare one.
pub const IMPLICIT_ID_FIELD: &str = "id";

/// An entity definition.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Fields addressing a row, in key order.
    pub identifier: Vec<String>,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
    /// Belongs-to relations owned by this entity.
    pub relations: Vec<RelationDef>,
    /// Access rules. Empty means the entity declares none.
    pub authorization: Vec<AuthRule>,
}

impl EntityDef {
    /// Create a model with the implicit auto-generated `id` identifier.
    pub fn model(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: vec![IMPLICIT_ID_FIELD.to_string()],
            fields: vec![FieldDef::id(IMPLICIT_ID_FIELD)
                .required()
                .with_default(DefaultValue::AutoId)],
            relations: Vec::new(),
            authorization: Vec::new(),
        }
    }

    /// Add a field to the entity.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Declare a belongs-to relation stored in `foreign_key`.
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let relation = RelationDef::belongs_to(name, self.name.clone(), target, foreign_key);
        self.relations.push(relation);
        self
    }

    /// Replace the identifier. Drops the implicit `id` field when it is no
    /// longer part of the key.
    pub fn identifier<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifier = fields.into_iter().map(Into::into).collect();
        if !self.identifier.iter().any(|f| f == IMPLICIT_ID_FIELD) {
            self.fields.retain(|f| {
                !(f.name == IMPLICIT_ID_FIELD && f.default == Some(DefaultValue::AutoId))
            });
        }
        self
    }

    /// Attach access rules.
    pub fn authorization(mut self, rules: impl IntoIterator<Item = AuthRule>) -> Self {
        self.authorization.extend(rules);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a relation by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Identifier field definitions, in key order. Undeclared names are skipped.
    pub fn identifier_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.identifier.iter().filter_map(|name| self.get_field(name))
    }

    /// Check whether a field is part of the identifier.
    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifier.iter().any(|f| f == field)
    }

    /// All required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Check whether the entity declares any access rule.
    pub fn has_authorization(&self) -> bool {
        !self.authorization.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_identifier() {
        let todo = EntityDef::model("Todo").field(FieldDef::string("content"));

        assert_eq!(todo.identifier, vec!["id".to_string()]);
        let id = todo.get_field("id").unwrap();
        assert!(id.required);
        assert_eq!(id.default, Some(DefaultValue::AutoId));
        assert_eq!(todo.fields.len(), 2);
    }

    #[test]
    fn test_explicit_identifier_drops_implicit_id() {
        let subject = EntityDef::model("subject")
            .field(FieldDef::id("subjectId").required())
            .field(FieldDef::string("name"))
            .identifier(["subjectId"]);

        assert!(subject.get_field("id").is_none());
        assert!(subject.is_identifier("subjectId"));
        assert_eq!(subject.identifier_fields().count(), 1);
    }

    #[test]
    fn test_belongs_to_and_lookup() {
        let charge = EntityDef::model("charges")
            .field(FieldDef::id("chargeId").required())
            .field(FieldDef::float("amount").required())
            .field(FieldDef::id("officeManagerId").required())
            .belongs_to("officeManager", "officeManager", "officeManagerId")
            .identifier(["chargeId"]);

        let rel = charge.get_relation("officeManager").unwrap();
        assert_eq!(rel.from_entity, "charges");
        assert_eq!(rel.foreign_key, "officeManagerId");
        assert_eq!(charge.required_fields().count(), 3);
        assert!(!charge.has_authorization());
    }
}
