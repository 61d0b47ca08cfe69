//! Read paths: single-row get and paginated list.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use tuition_core::storage::RecordKey;
use tuition_core::value::record_to_json;

use crate::database::Database;
use crate::error::Error;

/// Default page size for `list`.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Largest accepted page size.
pub const MAX_LIST_LIMIT: usize = 1000;

/// One page of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub items: Vec<JsonValue>,
    /// Token for the next page; absent on the last page.
    pub next_token: Option<String>,
}

/// Executes reads against the database.
pub struct QueryExecutor<'a> {
    database: &'a Database,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    /// Fetch a row by identifier. Missing rows yield `null`.
    pub fn get(&self, model: &str, key_input: &Map<String, JsonValue>) -> Result<JsonValue, Error> {
        let key = self.database.validator().key_from_json(model, key_input)?;

        match self.database.storage().get(model, &key)? {
            Some(record) => Ok(JsonValue::Object(record_to_json(&record.decode_data()?))),
            None => Ok(JsonValue::Null),
        }
    }

    /// List rows in identifier order, starting after `next_token`.
    pub fn list(
        &self,
        model: &str,
        limit: Option<usize>,
        next_token: Option<&str>,
    ) -> Result<ListPage, Error> {
        self.database.schema().entity(model)?;

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(Error::Request(format!(
                "limit must be between 1 and {}",
                MAX_LIST_LIMIT
            )));
        }

        let after = match next_token {
            Some(token) => Some(
                RecordKey::from_token(token)
                    .ok_or_else(|| Error::Request("invalid next token".to_string()))?,
            ),
            None => None,
        };

        let mut rows = self.database.storage().scan_after(model, after.as_ref())?;
        let mut items = Vec::with_capacity(limit.min(64));
        let mut last_key = None;

        for row in rows.by_ref().take(limit) {
            let (key, record) = row?;
            items.push(JsonValue::Object(record_to_json(&record.decode_data()?)));
            last_key = Some(key);
        }

        let next_token = match (rows.next(), last_key) {
            (Some(_), Some(key)) => Some(key.to_token()),
            _ => None,
        };

        Ok(ListPage { items, next_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::mutation::MutationExecutor;
    use serde_json::json;

    fn seeded() -> Database {
        let db = Database::open(&ServerConfig::temporary()).unwrap();
        let executor = MutationExecutor::new(&db);
        for id in ["algebra", "biology", "chemistry", "drawing", "english"] {
            executor
                .create("subject", json!({"subjectId": id}).as_object().unwrap())
                .unwrap();
        }
        db
    }

    fn ids(page: &ListPage) -> Vec<&str> {
        page.items
            .iter()
            .map(|item| item["subjectId"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_get() {
        let db = seeded();
        let query = QueryExecutor::new(&db);

        let row = query
            .get("subject", json!({"subjectId": "biology"}).as_object().unwrap())
            .unwrap();
        assert_eq!(row, json!({"subjectId": "biology"}));

        let missing = query
            .get("subject", json!({"subjectId": "latin"}).as_object().unwrap())
            .unwrap();
        assert!(missing.is_null());
    }

    #[test]
    fn test_list_pages() {
        let db = seeded();
        let query = QueryExecutor::new(&db);

        let first = query.list("subject", Some(2), None).unwrap();
        assert_eq!(ids(&first), vec!["algebra", "biology"]);
        let token = first.next_token.clone().unwrap();

        let second = query.list("subject", Some(2), Some(&token)).unwrap();
        assert_eq!(ids(&second), vec!["chemistry", "drawing"]);

        let third = query
            .list("subject", Some(2), second.next_token.as_deref())
            .unwrap();
        assert_eq!(ids(&third), vec!["english"]);
        assert!(third.next_token.is_none());
    }

    #[test]
    fn test_exact_page_has_no_token() {
        let db = seeded();
        let page = QueryExecutor::new(&db).list("subject", Some(5), None).unwrap();

        assert_eq!(page.items.len(), 5);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_list_rejects_bad_input() {
        let db = seeded();
        let query = QueryExecutor::new(&db);

        assert!(matches!(query.list("subject", Some(0), None), Err(Error::Request(_))));
        assert!(matches!(
            query.list("subject", None, Some("zz")),
            Err(Error::Request(_))
        ));
        assert!(matches!(
            query.list("course", None, None),
            Err(Error::Storage(tuition_core::Error::UnknownModel(_)))
        ));
    }
}
