//! The tuition-management data model.
//!
//! Declares every model, its belongs-to edges, the access rules, and the
//! `addUserToGroup` mutation as one immutable `SchemaBundle`. Build it once
//! at startup and pass it to whatever needs it.

use crate::catalog::{
    AuthRule, AuthorizationModes, CustomOperationDef, DefaultValue, EntityDef, FieldDef,
    SchemaBundle,
};
use crate::error::Error;

/// Group allowed to invoke `addUserToGroup`.
pub const ADMINS_GROUP: &str = "ADMINS";

/// Name of the group-membership mutation and of its handler.
pub const ADD_USER_TO_GROUP: &str = "addUserToGroup";

/// Literals accepted by `student.status` and `enrollment.status`.
pub const STATUS_LITERALS: [&str; 3] = ["active", "suspended", "inactive"];

/// Literals accepted by `professor.status` and `officeManager.status`.
///
/// "suspende" is kept exactly as declared for these two models.
pub const STAFF_STATUS_LITERALS: [&str; 3] = ["active", "suspende", "inactive"];

/// Literals accepted by `studentPayment.type`.
pub const STUDENT_PAYMENT_TYPES: [&str; 3] = ["mensuelle", "inscription", "autre"];

/// Literals accepted by `bankOperation.type`.
pub const BANK_OPERATION_TYPES: [&str; 3] = ["cheque", "verssment", "virement"];

/// Literals accepted by `cashierOperation.flux`.
pub const CASHIER_FLUX: [&str; 2] = ["INCOME", "EXPENSE"];

/// Build and validate the tuition schema.
pub fn schema() -> Result<SchemaBundle, Error> {
    SchemaBundle::new(1)
        .with_entity(todo())
        .with_entity(student())
        .with_entity(staff("professor", "professorId"))
        .with_entity(staff("officeManager", "officeManagerId"))
        .with_entity(subject())
        .with_entity(enrollment())
        .with_entity(professor_payment())
        .with_entity(student_payment())
        .with_entity(bank_operation())
        .with_entity(charges())
        .with_entity(cashier_operation())
        .with_entity(tuition_payments())
        .with_operation(add_user_to_group())
        .with_authorization_modes(AuthorizationModes::default())
        .build()
}

fn created_at() -> FieldDef {
    FieldDef::date("createdAt").with_default(DefaultValue::CurrentDate)
}

fn office_manager_id() -> FieldDef {
    FieldDef::id("officeManagerId").required()
}

fn todo() -> EntityDef {
    EntityDef::model("Todo")
        .field(FieldDef::string("content"))
        .authorization([AuthRule::public_api_key()])
}

fn student() -> EntityDef {
    EntityDef::model("student")
        .with_fields([
            FieldDef::id("studentId").required(),
            FieldDef::string("fullName").required(),
            FieldDef::string("email").required(),
            FieldDef::string("groupCode"),
            FieldDef::string("phone"),
            FieldDef::enumeration("status", "StudentStatus", STATUS_LITERALS),
            FieldDef::date("registration"),
            created_at(),
        ])
        .identifier(["studentId"])
}

// professor and officeManager share one shape
fn staff(name: &str, id_field: &str) -> EntityDef {
    let status_enum = format!("{}{}Status", name[..1].to_uppercase(), &name[1..]);
    EntityDef::model(name)
        .with_fields([
            FieldDef::id(id_field).required(),
            FieldDef::string("fullName"),
            FieldDef::string("email"),
            FieldDef::string("phone"),
            FieldDef::enumeration("status", status_enum, STAFF_STATUS_LITERALS),
        ])
        .identifier([id_field])
}

fn subject() -> EntityDef {
    EntityDef::model("subject")
        .with_fields([
            FieldDef::id("subjectId").required(),
            FieldDef::string("name"),
            FieldDef::string("type"),
        ])
        .identifier(["subjectId"])
}

fn enrollment() -> EntityDef {
    EntityDef::model("enrollment")
        .with_fields([
            FieldDef::id("enrollmentId").required(),
            FieldDef::enumeration("status", "EnrollmentStatus", STATUS_LITERALS),
            created_at(),
            FieldDef::id("studentId").required(),
            FieldDef::id("subjectId").required(),
            FieldDef::id("professorId").required(),
            office_manager_id(),
        ])
        .belongs_to("student", "student", "studentId")
        .belongs_to("subject", "subject", "subjectId")
        .belongs_to("professor", "professor", "professorId")
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["enrollmentId"])
}

fn professor_payment() -> EntityDef {
    EntityDef::model("professorPayment")
        .with_fields([
            FieldDef::id("paymentId").required(),
            FieldDef::date("paymentDate"),
            FieldDef::float("amount"),
            FieldDef::integer("month"),
            created_at(),
            FieldDef::id("professorId").required(),
            office_manager_id(),
        ])
        .belongs_to("professor", "professor", "professorId")
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["paymentId"])
}

fn student_payment() -> EntityDef {
    EntityDef::model("studentPayment")
        .with_fields([
            FieldDef::id("paymentId").required(),
            FieldDef::date("paymentDate"),
            FieldDef::float("amount"),
            FieldDef::enumeration("type", "StudentPaymentType", STUDENT_PAYMENT_TYPES),
            FieldDef::integer("month"),
            created_at(),
            FieldDef::id("enrollmentId").required(),
            office_manager_id(),
        ])
        .belongs_to("enrollment", "enrollment", "enrollmentId")
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["paymentId"])
}

fn bank_operation() -> EntityDef {
    EntityDef::model("bankOperation")
        .with_fields([
            FieldDef::id("operationId").required(),
            FieldDef::float("amount"),
            FieldDef::enumeration("type", "BankOperationType", BANK_OPERATION_TYPES),
            FieldDef::string("description"),
            created_at(),
            office_manager_id(),
        ])
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["operationId"])
}

fn charges() -> EntityDef {
    EntityDef::model("charges")
        .with_fields([
            FieldDef::id("chargeId").required(),
            FieldDef::float("amount").required(),
            FieldDef::string("description").required(),
            created_at(),
            office_manager_id(),
        ])
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["chargeId"])
}

fn cashier_operation() -> EntityDef {
    EntityDef::model("cashierOperation")
        .with_fields([
            FieldDef::id("operationId").required(),
            FieldDef::float("amount"),
            FieldDef::enumeration("flux", "CashierFlux", CASHIER_FLUX),
            FieldDef::string("description"),
            created_at(),
            office_manager_id(),
        ])
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["operationId"])
}

fn tuition_payments() -> EntityDef {
    EntityDef::model("tuitionPayments")
        .with_fields([
            FieldDef::id("tuitionPaymentId").required(),
            FieldDef::float("amount").required(),
            FieldDef::date("dueDate").required(),
            FieldDef::string("reason"),
            created_at(),
            office_manager_id(),
        ])
        .belongs_to("officeManager", "officeManager", "officeManagerId")
        .identifier(["tuitionPaymentId"])
}

fn add_user_to_group() -> CustomOperationDef {
    CustomOperationDef::mutation(ADD_USER_TO_GROUP)
        .arguments([
            FieldDef::string("userId").required(),
            FieldDef::string("groupName").required(),
        ])
        .authorization([AuthRule::group(ADMINS_GROUP)])
        .handler(ADD_USER_TO_GROUP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AuthMode, FieldType, OperationKind, ScalarType};

    fn literals(entity: &str, field: &str) -> Vec<String> {
        let schema = schema().unwrap();
        match &schema.entity(entity).unwrap().get_field(field).unwrap().field_type {
            FieldType::Enum { variants, .. } => variants.clone(),
            other => panic!("{}.{} is not an enum: {:?}", entity, field, other),
        }
    }

    #[test]
    fn test_schema_builds() {
        let schema = schema().unwrap();
        assert_eq!(schema.entities.len(), 12);
        assert_eq!(schema.operations.len(), 1);
    }

    #[test]
    fn test_identifiers() {
        let schema = schema().unwrap();
        let expected = [
            ("Todo", "id"),
            ("student", "studentId"),
            ("professor", "professorId"),
            ("officeManager", "officeManagerId"),
            ("subject", "subjectId"),
            ("enrollment", "enrollmentId"),
            ("professorPayment", "paymentId"),
            ("studentPayment", "paymentId"),
            ("bankOperation", "operationId"),
            ("charges", "chargeId"),
            ("cashierOperation", "operationId"),
            ("tuitionPayments", "tuitionPaymentId"),
        ];

        for (entity, id) in expected {
            let def = schema.entity(entity).unwrap();
            assert_eq!(def.identifier, vec![id.to_string()], "{}", entity);
            assert!(def.get_field(id).unwrap().required, "{}", entity);
        }
    }

    #[test]
    fn test_staff_status_keeps_declared_literal() {
        for entity in ["professor", "officeManager"] {
            let values = literals(entity, "status");
            assert_eq!(values, vec!["active", "suspende", "inactive"]);
            assert!(!values.contains(&"suspended".to_string()));
        }
        assert_eq!(
            literals("student", "status"),
            vec!["active", "suspended", "inactive"]
        );
        assert_eq!(
            literals("enrollment", "status"),
            vec!["active", "suspended", "inactive"]
        );
    }

    #[test]
    fn test_other_enum_literals() {
        assert_eq!(
            literals("studentPayment", "type"),
            vec!["mensuelle", "inscription", "autre"]
        );
        assert_eq!(
            literals("bankOperation", "type"),
            vec!["cheque", "verssment", "virement"]
        );
        assert_eq!(literals("cashierOperation", "flux"), vec!["INCOME", "EXPENSE"]);
    }

    #[test]
    fn test_enrollment_relations() {
        let schema = schema().unwrap();
        let enrollment = schema.entity("enrollment").unwrap();

        let targets: Vec<_> = enrollment
            .relations
            .iter()
            .map(|r| (r.to_entity.as_str(), r.foreign_key.as_str()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("student", "studentId"),
                ("subject", "subjectId"),
                ("professor", "professorId"),
                ("officeManager", "officeManagerId"),
            ]
        );
    }

    #[test]
    fn test_office_manager_is_widely_referenced() {
        let schema = schema().unwrap();
        let mut referencing: Vec<_> = schema
            .relations_to("officeManager")
            .into_iter()
            .map(|r| r.from_entity.clone())
            .collect();
        referencing.sort();

        assert_eq!(
            referencing,
            vec![
                "bankOperation",
                "cashierOperation",
                "charges",
                "enrollment",
                "professorPayment",
                "studentPayment",
                "tuitionPayments",
            ]
        );
    }

    #[test]
    fn test_required_fields() {
        let schema = schema().unwrap();
        let required = |entity: &str| -> Vec<String> {
            schema
                .entity(entity)
                .unwrap()
                .required_fields()
                .map(|f| f.name.clone())
                .collect()
        };

        assert_eq!(required("charges"), vec!["chargeId", "amount", "description", "officeManagerId"]);
        assert_eq!(
            required("tuitionPayments"),
            vec!["tuitionPaymentId", "amount", "dueDate", "officeManagerId"]
        );
        assert_eq!(required("student"), vec!["studentId", "fullName", "email"]);
    }

    #[test]
    fn test_created_at_defaults() {
        let schema = schema().unwrap();
        for entity in ["student", "enrollment", "professorPayment", "charges"] {
            let field = schema.entity(entity).unwrap().get_field("createdAt").unwrap();
            assert_eq!(field.default, Some(DefaultValue::CurrentDate), "{}", entity);
            assert!(!field.required);
        }
        assert!(schema.entity("professor").unwrap().get_field("createdAt").is_none());
    }

    #[test]
    fn test_authorization() {
        let schema = schema().unwrap();

        assert_eq!(
            schema.entity("Todo").unwrap().authorization,
            vec![AuthRule::public_api_key()]
        );
        for name in schema.entity_names() {
            if name != "Todo" {
                assert!(!schema.entity(name).unwrap().has_authorization(), "{}", name);
            }
        }

        let op = schema.get_operation(ADD_USER_TO_GROUP).unwrap();
        assert_eq!(op.kind, OperationKind::Mutation);
        assert_eq!(op.authorization, vec![AuthRule::group("ADMINS")]);
        assert_eq!(op.returns, FieldType::scalar(ScalarType::Json));
        assert!(op.get_argument("userId").unwrap().required);
        assert!(op.get_argument("groupName").unwrap().required);

        assert_eq!(schema.authorization_modes.default_mode, AuthMode::ApiKey);
        assert_eq!(schema.authorization_modes.api_key_expires_in_days, 30);
    }
}
