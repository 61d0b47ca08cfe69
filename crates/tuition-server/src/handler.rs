//! Request handler for processing client requests.
//!
//! Every model or mutation call is authenticated, then authorized against the
//! declared rules, then dispatched to the executors or a function handler.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value as JsonValue};

use tuition_core::catalog::{AuthRule, ModelOperation};
use tuition_core::security::{AccessPolicy, SecurityContext, SecurityError};

use crate::auth::{Authenticator, Credentials, JwtAuthenticator};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::error::Error;
use crate::functions::{validate_arguments, AddUserToGroup, FunctionRegistry, MemoryDirectory};
use crate::mutation::MutationExecutor;
use crate::query::QueryExecutor;
use crate::request::{Operation, Request, Response};

/// Handles incoming requests and dispatches to appropriate handlers.
pub struct RequestHandler {
    database: Arc<Database>,
    authenticator: Authenticator,
    policy: AccessPolicy,
    functions: FunctionRegistry,
}

impl RequestHandler {
    /// Create a handler from its parts.
    ///
    /// Fails if a custom operation in the schema has no registered handler.
    pub fn new(
        database: Arc<Database>,
        authenticator: Authenticator,
        policy: AccessPolicy,
        functions: FunctionRegistry,
    ) -> Result<Self, Error> {
        functions.check_schema(database.schema())?;
        Ok(Self {
            database,
            authenticator,
            policy,
            functions,
        })
    }

    /// Build the standard handler for a configuration: API keys from the
    /// database, bearer tokens when a JWT secret is set, and `addUserToGroup`
    /// over an in-memory directory holding every group the schema's operation
    /// rules name plus the configured extra groups and users.
    pub fn from_config(database: Arc<Database>, config: &ServerConfig) -> Result<Self, Error> {
        let mut authenticator = Authenticator::new().with_api_keys(database.api_keys().clone());
        if let Some(secret) = &config.jwt_secret {
            let mut jwt = JwtAuthenticator::with_secret_str(secret);
            if let Some(issuer) = &config.jwt_issuer {
                jwt = jwt.with_issuer(issuer.clone());
            }
            authenticator = authenticator.with_tokens(Arc::new(jwt));
        }

        let directory = MemoryDirectory::new();
        let rule_groups = database
            .schema()
            .operations
            .values()
            .flat_map(|op| &op.authorization)
            .filter_map(|rule| match rule {
                AuthRule::Group { group, .. } => Some(group),
                AuthRule::PublicApiKey { .. } => None,
            });
        for group in rule_groups.chain(&config.directory_groups) {
            directory.add_group(group.clone());
        }
        for user in &config.directory_users {
            directory.add_user(user.clone());
        }
        let functions =
            FunctionRegistry::new().with_handler(Arc::new(AddUserToGroup::new(Arc::new(directory))));

        let policy = AccessPolicy::new(
            config.unlabeled_access,
            &database.schema().authorization_modes,
        );

        Self::new(database, authenticator, policy, functions)
    }

    /// Get the database.
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Handle a request and return a response.
    pub fn handle(&self, request: &Request) -> Response {
        match self.handle_inner(request) {
            Ok(data) => Response::ok(request.id, data),
            Err(e) => {
                tracing::debug!(
                    request_id = request.id,
                    operation = request.operation.name(),
                    code = e.code(),
                    error = %e,
                    "request failed"
                );
                Response::error(request.id, e.code(), e.to_string())
            }
        }
    }

    fn handle_inner(&self, request: &Request) -> Result<JsonValue, Error> {
        match &request.operation {
            Operation::GetSchema => {
                self.authenticate_caller(&request.credentials)?;
                self.handle_get_schema()
            }
            Operation::Create { model, input } => {
                self.authorize(&request.credentials, model, ModelOperation::Create)?;
                MutationExecutor::new(&self.database).create(model, input)
            }
            Operation::Get { model, key } => {
                self.authorize(&request.credentials, model, ModelOperation::Read)?;
                QueryExecutor::new(&self.database).get(model, key)
            }
            Operation::Update { model, input } => {
                self.authorize(&request.credentials, model, ModelOperation::Update)?;
                MutationExecutor::new(&self.database).update(model, input)
            }
            Operation::Delete { model, key } => {
                self.authorize(&request.credentials, model, ModelOperation::Delete)?;
                MutationExecutor::new(&self.database).delete(model, key)
            }
            Operation::List {
                model,
                limit,
                next_token,
            } => {
                self.authorize(&request.credentials, model, ModelOperation::List)?;
                let page = QueryExecutor::new(&self.database).list(
                    model,
                    *limit,
                    next_token.as_deref(),
                )?;
                Ok(serde_json::to_value(page)?)
            }
            Operation::Mutation { name, arguments } => {
                self.handle_mutation(&request.credentials, name, arguments)
            }
        }
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<SecurityContext, Error> {
        self.authenticator
            .authenticate(credentials, Utc::now())
            .map_err(|e| {
                tracing::warn!(error = %e, "authentication failed");
                Error::Security(e)
            })
    }

    /// Authenticate and reject anonymous callers outright.
    fn authenticate_caller(&self, credentials: &Credentials) -> Result<SecurityContext, Error> {
        let ctx = self.authenticate(credentials)?;
        if ctx.is_anonymous() {
            return Err(Error::Security(SecurityError::AuthenticationFailed(
                "no credentials presented".to_string(),
            )));
        }
        Ok(ctx)
    }

    fn authorize(
        &self,
        credentials: &Credentials,
        model: &str,
        operation: ModelOperation,
    ) -> Result<SecurityContext, Error> {
        let ctx = self.authenticate(credentials)?;
        let entity = self.database.schema().entity(model)?;

        self.policy
            .authorize_model(&ctx, entity, operation)
            .map_err(|e| {
                tracing::warn!(caller = %ctx.describe(), model, %operation, "access denied");
                Error::Security(e)
            })?;
        Ok(ctx)
    }

    fn handle_mutation(
        &self,
        credentials: &Credentials,
        name: &str,
        arguments: &Map<String, JsonValue>,
    ) -> Result<JsonValue, Error> {
        let ctx = self.authenticate(credentials)?;
        let op = self
            .database
            .schema()
            .get_operation(name)
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))?;

        self.policy.authorize_operation(&ctx, op).map_err(|e| {
            tracing::warn!(caller = %ctx.describe(), operation = name, "access denied");
            Error::Security(e)
        })?;
        validate_arguments(op, arguments)?;

        let handler = self
            .functions
            .get(&op.handler)
            .ok_or_else(|| Error::UnknownOperation(op.handler.clone()))?;
        Ok(handler.invoke(&ctx, arguments)?)
    }

    fn handle_get_schema(&self) -> Result<JsonValue, Error> {
        Ok(serde_json::to_value(self.database.schema().as_ref())?)
    }
}
