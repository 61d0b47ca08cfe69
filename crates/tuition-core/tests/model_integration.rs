//! Integration tests for the tuition model: catalog, validation, and storage together.

use chrono::NaiveDate;
use serde_json::{json, Map, Value as JsonValue};
use tuition_core::catalog::{Catalog, ModelOperation};
use tuition_core::storage::{Record, RecordKey, StorageConfig, StorageEngine};
use tuition_core::{
    tuition, AccessPolicy, ConstraintError, ConstraintValidator, Error, ReferentialPolicy,
    SchemaBundle, SecurityContext, SecurityError, Value,
};

struct TestContext {
    storage: StorageEngine,
    schema: SchemaBundle,
    _storage_dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let storage = StorageEngine::open(
            StorageConfig::new(storage_dir.path()).with_flush_every_ms(None),
        )
        .unwrap();

        Self {
            storage,
            schema: tuition::schema().unwrap(),
            _storage_dir: storage_dir,
        }
    }

    fn validator(&self) -> ConstraintValidator<'_> {
        ConstraintValidator::new(&self.schema, &self.storage, ReferentialPolicy::Enforce)
    }

    fn create(&self, entity: &str, input: JsonValue, today: NaiveDate) -> Result<RecordKey, Error> {
        let (key, data) = self.validator().prepare_create(entity, &object(input), today)?;
        self.storage.insert(entity, &key, &Record::new(&data)?)?;
        Ok(key)
    }

    fn seed_references(&self) {
        let today = day(2025, 1, 6);
        self.create(
            "student",
            json!({"studentId": "s1", "fullName": "Yassine B.", "email": "y@school.ma"}),
            today,
        )
        .unwrap();
        self.create("subject", json!({"subjectId": "math", "name": "Math"}), today)
            .unwrap();
        self.create("professor", json!({"professorId": "p1", "status": "active"}), today)
            .unwrap();
        self.create("officeManager", json!({"officeManagerId": "om1"}), today)
            .unwrap();
    }
}

fn object(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn minimal_input(entity: &str) -> JsonValue {
    match entity {
        "Todo" => json!({}),
        "student" => json!({"studentId": "x", "fullName": "F", "email": "e"}),
        "professor" => json!({"professorId": "x"}),
        "officeManager" => json!({"officeManagerId": "x"}),
        "subject" => json!({"subjectId": "x"}),
        "enrollment" => json!({
            "enrollmentId": "x", "studentId": "s1", "subjectId": "math",
            "professorId": "p1", "officeManagerId": "om1"
        }),
        "professorPayment" => json!({"paymentId": "x", "professorId": "p1", "officeManagerId": "om1"}),
        "studentPayment" => json!({"paymentId": "x", "enrollmentId": "e1", "officeManagerId": "om1"}),
        "bankOperation" => json!({"operationId": "x", "officeManagerId": "om1"}),
        "charges" => json!({"chargeId": "x", "amount": 10.0, "description": "d", "officeManagerId": "om1"}),
        "cashierOperation" => json!({"operationId": "x", "officeManagerId": "om1"}),
        "tuitionPayments" => json!({
            "tuitionPaymentId": "x", "amount": 10.0, "dueDate": "2025-02-01",
            "officeManagerId": "om1"
        }),
        other => panic!("no fixture for {}", other),
    }
}

#[test]
fn test_missing_required_field_rejected_for_every_entity() {
    let ctx = TestContext::new();
    ctx.seed_references();
    ctx.create(
        "enrollment",
        json!({
            "enrollmentId": "e1", "studentId": "s1", "subjectId": "math",
            "professorId": "p1", "officeManagerId": "om1"
        }),
        day(2025, 1, 6),
    )
    .unwrap();

    let validator = ctx.validator();
    for entity in ctx.schema.entity_names() {
        let def = ctx.schema.entity(entity).unwrap();
        let full = object(minimal_input(entity));
        assert!(
            validator.prepare_create(entity, &full, day(2025, 1, 6)).is_ok(),
            "minimal {} should be accepted",
            entity
        );

        for field in def.required_fields().filter(|f| !f.has_default()) {
            let mut input = full.clone();
            input.remove(&field.name);
            let err = validator
                .prepare_create(entity, &input, day(2025, 1, 6))
                .unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::ConstraintViolation(ConstraintError::MissingRequired { .. })
                ),
                "{}.{} accepted while missing: {:?}",
                entity,
                field.name,
                err
            );
        }
    }
}

#[test]
fn test_student_status_outside_literal_set_rejected() {
    let ctx = TestContext::new();

    let err = ctx
        .create(
            "student",
            json!({"studentId": "s9", "fullName": "A", "email": "e", "status": "pending"}),
            day(2025, 1, 6),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ConstraintViolation(ConstraintError::InvalidEnumValue { .. })
    ));

    for (i, status) in ["active", "suspended", "inactive"].iter().enumerate() {
        ctx.create(
            "student",
            json!({"studentId": format!("s{}", i), "fullName": "A", "email": "e", "status": status}),
            day(2025, 1, 6),
        )
        .unwrap();
    }
}

#[test]
fn test_enrollment_with_unknown_student_rejected() {
    let ctx = TestContext::new();
    ctx.seed_references();

    let err = ctx
        .create(
            "enrollment",
            json!({
                "enrollmentId": "e1", "studentId": "nobody", "subjectId": "math",
                "professorId": "p1", "officeManagerId": "om1"
            }),
            day(2025, 1, 6),
        )
        .unwrap_err();

    match err {
        Error::ConstraintViolation(ConstraintError::ForeignKeyViolation {
            field,
            referenced_entity,
            value,
            ..
        }) => {
            assert_eq!(field, "studentId");
            assert_eq!(referenced_entity, "student");
            assert_eq!(value, "nobody");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(ctx.storage.count("enrollment").unwrap(), 0);
}

#[test]
fn test_referenced_student_cannot_be_deleted() {
    let ctx = TestContext::new();
    ctx.seed_references();
    ctx.create(
        "enrollment",
        json!({
            "enrollmentId": "e1", "studentId": "s1", "subjectId": "math",
            "professorId": "p1", "officeManagerId": "om1"
        }),
        day(2025, 1, 6),
    )
    .unwrap();

    let err = ctx
        .validator()
        .validate_delete("student", &RecordKey::new(["s1"]))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ConstraintViolation(ConstraintError::RestrictViolation { .. })
    ));
}

#[test]
fn test_duplicate_identifier_rejected() {
    let ctx = TestContext::new();
    let today = day(2025, 1, 6);

    ctx.create("subject", json!({"subjectId": "math", "name": "Math"}), today)
        .unwrap();
    let err = ctx
        .create("subject", json!({"subjectId": "math", "name": "Physics"}), today)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ConstraintViolation(ConstraintError::DuplicateIdentifier { .. })
    ));
}

#[test]
fn test_access_rules() {
    let schema = tuition::schema().unwrap();
    let policy = AccessPolicy::new(Default::default(), &schema.authorization_modes);
    let todo = schema.entity("Todo").unwrap();
    let add_user = schema.get_operation(tuition::ADD_USER_TO_GROUP).unwrap();

    for op in ModelOperation::ALL {
        assert!(policy
            .authorize_model(&SecurityContext::api_key("k"), todo, op)
            .is_ok());
        assert!(matches!(
            policy.authorize_model(&SecurityContext::anonymous(), todo, op),
            Err(SecurityError::AuthenticationFailed(_))
        ));
    }

    assert!(policy
        .authorize_operation(&SecurityContext::user("admin", ["ADMINS"]), add_user)
        .is_ok());
    assert!(matches!(
        policy.authorize_operation(&SecurityContext::user("clerk", ["OFFICE"]), add_user),
        Err(SecurityError::PermissionDenied(_))
    ));
}

#[test]
fn test_professor_payment_created_at_defaults_to_creation_date() {
    let ctx = TestContext::new();
    ctx.seed_references();
    let today = day(2025, 2, 28);

    let key = ctx
        .create(
            "professorPayment",
            json!({"paymentId": "pp1", "amount": 3500.0, "month": 2, "professorId": "p1", "officeManagerId": "om1"}),
            today,
        )
        .unwrap();

    let stored = ctx.storage.get("professorPayment", &key).unwrap().unwrap();
    let data = stored.decode_data().unwrap();
    assert_eq!(data["createdAt"], Value::Date(today));
    assert_eq!(data["month"], Value::Integer(2));
}

#[test]
fn test_staff_status_accepts_only_declared_literal() {
    let ctx = TestContext::new();
    let today = day(2025, 1, 6);

    ctx.create("professor", json!({"professorId": "p1", "status": "suspende"}), today)
        .unwrap();
    ctx.create(
        "officeManager",
        json!({"officeManagerId": "om1", "status": "suspende"}),
        today,
    )
    .unwrap();

    for (entity, id_field) in [("professor", "professorId"), ("officeManager", "officeManagerId")] {
        let mut input = Map::new();
        input.insert(id_field.to_string(), json!("other"));
        input.insert("status".to_string(), json!("suspended"));
        let err = ctx
            .create(entity, JsonValue::Object(input), today)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintError::InvalidEnumValue { .. })
        ));
    }
}

#[test]
fn test_catalog_persists_tuition_schema() {
    let dir = tempfile::tempdir().unwrap();
    // no background flusher, so dropping the handle releases the lock
    let config = sled::Config::new().path(dir.path()).flush_every_ms(None);

    {
        let db = config.clone().open().unwrap();
        let catalog = Catalog::open(&db).unwrap();
        assert_eq!(catalog.apply_schema(tuition::schema().unwrap()).unwrap(), 1);
        catalog.flush().unwrap();
    }

    let db = config.open().unwrap();
    let catalog = Catalog::open(&db).unwrap();
    assert_eq!(catalog.current_version(), 1);
    assert_eq!(catalog.list_entities().len(), 12);

    // re-applying the same declaration does not bump the version
    assert_eq!(catalog.apply_schema(tuition::schema().unwrap()).unwrap(), 1);
}
