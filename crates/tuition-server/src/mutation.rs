//! Mutation executor for model writes.

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use tuition_core::storage::Record;
use tuition_core::value::record_to_json;

use crate::database::Database;
use crate::error::Error;

/// Executes create, update, and delete against the database.
pub struct MutationExecutor<'a> {
    database: &'a Database,
    today: NaiveDate,
}

impl<'a> MutationExecutor<'a> {
    /// Create a new mutation executor dated today (UTC).
    pub fn new(database: &'a Database) -> Self {
        Self::dated(database, Utc::now().date_naive())
    }

    /// Create an executor that fills date defaults with `today`.
    pub fn dated(database: &'a Database, today: NaiveDate) -> Self {
        Self { database, today }
    }

    /// Create a row and return it as stored.
    pub fn create(&self, model: &str, input: &Map<String, JsonValue>) -> Result<JsonValue, Error> {
        let (key, data) = self
            .database
            .validator()
            .prepare_create(model, input, self.today)?;

        self.database
            .storage()
            .insert(model, &key, &Record::new(&data)?)?;

        info!(model, key = %key, "row created");
        Ok(JsonValue::Object(record_to_json(&data)))
    }

    /// Patch a row selected by the identifier fields in `input`.
    pub fn update(&self, model: &str, input: &Map<String, JsonValue>) -> Result<JsonValue, Error> {
        let validator = self.database.validator();
        let key = validator.key_from_json(model, input)?;
        let (existing, data) = validator.prepare_update(model, &key, input)?;

        self.database
            .storage()
            .replace(model, &key, &existing.revise(&data)?)?;

        debug!(model, key = %key, fields = input.len(), "row updated");
        Ok(JsonValue::Object(record_to_json(&data)))
    }

    /// Delete a row and return what was removed.
    pub fn delete(&self, model: &str, key_input: &Map<String, JsonValue>) -> Result<JsonValue, Error> {
        let validator = self.database.validator();
        let key = validator.key_from_json(model, key_input)?;
        validator.validate_delete(model, &key)?;

        let removed = self
            .database
            .storage()
            .remove(model, &key)?
            .ok_or(tuition_core::Error::NotFound)?;

        info!(model, key = %key, "row deleted");
        Ok(JsonValue::Object(record_to_json(&removed.decode_data()?)))
    }
}
