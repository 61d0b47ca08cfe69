//! Request and response frames.
//!
//! One frame per line on the wire:
//!
//! ```json
//! {"id": 1, "credentials": {"type": "apiKey", "value": "tk_..."},
//!  "operation": {"op": "create", "model": "Todo", "input": {"content": "hi"}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::auth::Credentials;

/// Error codes carried in error responses.
pub mod error_codes {
    /// No valid credentials.
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    /// Authenticated but not allowed.
    pub const FORBIDDEN: &str = "FORBIDDEN";
    /// Addressed row does not exist.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Model is not declared.
    pub const UNKNOWN_MODEL: &str = "UNKNOWN_MODEL";
    /// Custom operation is not declared.
    pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
    /// Field-level constraint violated.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    /// Identifier already taken.
    pub const DUPLICATE_IDENTIFIER: &str = "DUPLICATE_IDENTIFIER";
    /// Belongs-to reference missing or still in use.
    pub const REFERENCE_VIOLATION: &str = "REFERENCE_VIOLATION";
    /// A function handler reported a failure.
    pub const FUNCTION_ERROR: &str = "FUNCTION_ERROR";
    /// Malformed or unacceptable request.
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    /// Anything else.
    pub const INTERNAL: &str = "INTERNAL";
}

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Client-chosen correlation id, echoed in the response.
    pub id: u64,
    /// Credentials for this request.
    #[serde(default)]
    pub credentials: Credentials,
    /// What to do.
    pub operation: Operation,
}

/// Request operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum Operation {
    /// Create a row.
    Create {
        model: String,
        input: Map<String, JsonValue>,
    },
    /// Fetch a row by identifier.
    Get {
        model: String,
        key: Map<String, JsonValue>,
    },
    /// Patch a row; the identifier fields in `input` select it.
    Update {
        model: String,
        input: Map<String, JsonValue>,
    },
    /// Delete a row by identifier.
    Delete {
        model: String,
        key: Map<String, JsonValue>,
    },
    /// Page through a model's rows in identifier order.
    #[serde(rename_all = "camelCase")]
    List {
        model: String,
        #[serde(default)]
        limit: Option<usize>,
        #[serde(default)]
        next_token: Option<String>,
    },
    /// Invoke a custom operation.
    Mutation {
        name: String,
        #[serde(default)]
        arguments: Map<String, JsonValue>,
    },
    /// Fetch the provisioning export of the schema.
    GetSchema,
}

impl Operation {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Get { .. } => "get",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::List { .. } => "list",
            Operation::Mutation { .. } => "mutation",
            Operation::GetSchema => "getSchema",
        }
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Ok,
    Error,
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// One of `error_codes`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// A response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request this answers (0 when the request was unreadable).
    pub id: u64,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Successful response.
    pub fn ok(id: u64, data: JsonValue) -> Self {
        Self {
            id,
            status: Status::Ok,
            data: Some(data),
            error: None,
        }
    }

    /// Error response.
    pub fn error(id: u64, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            status: Status::Error,
            data: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }

    /// Check for success.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Error code, if this is an error response.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}
