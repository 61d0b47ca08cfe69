//! Relation definitions between entities.

use rkyv::{Archive, Deserialize, Serialize};

/// Behavior when a referenced row is deleted.
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
pub enum DeleteBehavior {
    /// Prevent deletion while referencing rows exist.
    Restrict,
    /// Leave referencing rows dangling.
    NoAction,
}

/// A belongs-to relation: the owning entity stores the target's identifier in
/// a local foreign-key field.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct RelationDef {
    /// Relation name (unique within the owning entity).
    pub name: String,
    /// Owning entity.
    pub from_entity: String,
    /// Target entity.
    pub to_entity: String,
    /// Local field holding the target's identifier.
    pub foreign_key: String,
    /// Delete behavior on the target side.
    pub on_delete: DeleteBehavior,
}

impl RelationDef {
    /// Create a belongs-to relation.
    pub fn belongs_to(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            foreign_key: foreign_key.into(),
            on_delete: DeleteBehavior::Restrict,
        }
    }

    /// Set delete behavior.
    pub fn with_on_delete(mut self, on_delete: DeleteBehavior) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Qualified name, `entity.relation`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.from_entity, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belongs_to_relation() {
        let rel = RelationDef::belongs_to("student", "enrollment", "student", "studentId");

        assert_eq!(rel.from_entity, "enrollment");
        assert_eq!(rel.to_entity, "student");
        assert_eq!(rel.foreign_key, "studentId");
        assert_eq!(rel.on_delete, DeleteBehavior::Restrict);
        assert_eq!(rel.qualified_name(), "enrollment.student");
    }

    #[test]
    fn test_on_delete_override() {
        let rel = RelationDef::belongs_to("subject", "enrollment", "subject", "subjectId")
            .with_on_delete(DeleteBehavior::NoAction);

        assert_eq!(rel.on_delete, DeleteBehavior::NoAction);
    }
}
