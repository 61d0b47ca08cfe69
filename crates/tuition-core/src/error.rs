//! Core error types.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Record not found.
    #[error("record not found")]
    NotFound,

    /// Model is not declared in the schema.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A write violated a declared constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[from] ConstraintError),

    /// The schema declaration itself is inconsistent.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Write-time constraint violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    /// A required field was absent or null.
    #[error("{entity}.{field} is required")]
    MissingRequired {
        /// Entity being written.
        entity: String,
        /// Missing field.
        field: String,
    },

    /// The input named a field the entity does not declare.
    #[error("{entity} has no field named {field}")]
    UnknownField {
        /// Entity being written.
        entity: String,
        /// Offending field.
        field: String,
    },

    /// The value does not match the declared field type.
    #[error("{entity}.{field} expects {expected}, got {found}")]
    TypeMismatch {
        /// Entity being written.
        entity: String,
        /// Offending field.
        field: String,
        /// Declared type.
        expected: String,
        /// Description of the provided value.
        found: String,
    },

    /// An enum field received a literal outside its declared set.
    #[error("{entity}.{field} does not accept {value:?} (allowed: {allowed:?})")]
    InvalidEnumValue {
        /// Entity being written.
        entity: String,
        /// Enum field.
        field: String,
        /// Rejected literal.
        value: String,
        /// Declared literal set.
        allowed: Vec<String>,
    },

    /// A row with the same identifier already exists.
    #[error("{entity} with identifier {key} already exists")]
    DuplicateIdentifier {
        /// Entity being written.
        entity: String,
        /// Rendered identifier value.
        key: String,
    },

    /// An update tried to change an identifier field.
    #[error("{entity}.{field} is an identifier and cannot be changed")]
    IdentifierChange {
        /// Entity being written.
        entity: String,
        /// Identifier field.
        field: String,
    },

    /// A belongs-to reference points at a row that does not exist.
    #[error("{entity}.{field} references missing {referenced_entity} {value}")]
    ForeignKeyViolation {
        /// Relation name.
        relation: String,
        /// Entity holding the foreign key.
        entity: String,
        /// Foreign key field.
        field: String,
        /// Target entity.
        referenced_entity: String,
        /// Dangling key value.
        value: String,
    },

    /// A delete was refused because other rows still reference the target.
    #[error("cannot delete {entity} {key}: referenced by {count} {referencing_entity} row(s) via {relation}")]
    RestrictViolation {
        /// Relation name.
        relation: String,
        /// Entity being deleted.
        entity: String,
        /// Rendered identifier value.
        key: String,
        /// Entity holding references.
        referencing_entity: String,
        /// Number of referencing rows.
        count: usize,
    },
}

/// Defects detected while validating a schema declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Two fields share a name within one entity.
    #[error("{entity} declares field {field} more than once")]
    DuplicateField {
        /// Entity name.
        entity: String,
        /// Field name.
        field: String,
    },

    /// An identifier names a field that is not declared.
    #[error("{entity} identifier references undeclared field {field}")]
    UnknownIdentifierField {
        /// Entity name.
        entity: String,
        /// Field name.
        field: String,
    },

    /// An identifier field is optional.
    #[error("{entity} identifier field {field} must be required")]
    OptionalIdentifier {
        /// Entity name.
        entity: String,
        /// Field name.
        field: String,
    },

    /// An entity declares no identifier.
    #[error("{0} declares an empty identifier")]
    EmptyIdentifier(String),

    /// A relation targets an entity missing from the schema.
    #[error("{entity}.{relation} targets unknown entity {target}")]
    UnknownRelationTarget {
        /// Entity name.
        entity: String,
        /// Relation name.
        relation: String,
        /// Target entity.
        target: String,
    },

    /// A relation's foreign key field is missing or not an id.
    #[error("{entity}.{relation} foreign key {field} must be a declared id field")]
    InvalidForeignKey {
        /// Entity name.
        entity: String,
        /// Relation name.
        relation: String,
        /// Foreign key field.
        field: String,
    },

    /// A relation targets an entity with a composite identifier.
    #[error("{entity}.{relation} targets {target}, whose identifier is composite")]
    CompositeRelationTarget {
        /// Entity name.
        entity: String,
        /// Relation name.
        relation: String,
        /// Target entity.
        target: String,
    },

    /// A relation name shadows a field of the same entity.
    #[error("{entity}.{relation} collides with a field of the same name")]
    RelationShadowsField {
        /// Entity name.
        entity: String,
        /// Relation name.
        relation: String,
    },

    /// An enum declares no literals or repeats one.
    #[error("enum {name} must declare distinct, non-empty literals")]
    InvalidEnum {
        /// Enum type name.
        name: String,
    },

    /// A group rule names an empty group.
    #[error("{owner} declares a group rule with an empty group name")]
    EmptyGroup {
        /// Entity or operation owning the rule.
        owner: String,
    },

    /// A custom operation has no handler.
    #[error("custom operation {0} has no handler")]
    MissingHandler(String),

    /// A custom operation shares its name with a model.
    #[error("custom operation {0} collides with a model of the same name")]
    OperationShadowsModel(String),

    /// The API key lifetime is outside the accepted range.
    #[error("api key expiry must be between 1 and 365 days, got {0}")]
    InvalidApiKeyExpiry(u32),
}
