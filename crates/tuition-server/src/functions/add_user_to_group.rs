//! The `addUserToGroup` handler.
//!
//! Adds a user to a permission group in the identity directory and reports
//! what happened as JSON: `{"userId", "groupName", "status"}` where status is
//! `"added"` or `"alreadyMember"`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Map, Value as JsonValue};

use tuition_core::security::SecurityContext;
use tuition_core::tuition::ADD_USER_TO_GROUP;

use super::{FunctionError, FunctionHandler};

/// Identity service holding users and group memberships.
pub trait IdentityDirectory: Send + Sync {
    /// Add `user_id` to `group`. Returns false if it was already a member.
    fn add_user_to_group(&self, user_id: &str, group: &str) -> Result<bool, FunctionError>;

    /// Groups the user belongs to.
    fn groups_of(&self, user_id: &str) -> Result<Vec<String>, FunctionError>;
}

#[derive(Default)]
struct DirectoryState {
    users: BTreeMap<String, BTreeSet<String>>,
    groups: BTreeSet<String>,
}

/// In-process identity directory.
#[derive(Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a group.
    pub fn add_group(&self, group: impl Into<String>) {
        self.state.write().groups.insert(group.into());
    }

    /// Declare a user with no memberships.
    pub fn add_user(&self, user_id: impl Into<String>) {
        self.state.write().users.entry(user_id.into()).or_default();
    }

    /// Builder form of `add_group`.
    pub fn with_group(self, group: impl Into<String>) -> Self {
        self.add_group(group);
        self
    }

    /// Builder form of `add_user`.
    pub fn with_user(self, user_id: impl Into<String>) -> Self {
        self.add_user(user_id);
        self
    }
}

impl IdentityDirectory for MemoryDirectory {
    fn add_user_to_group(&self, user_id: &str, group: &str) -> Result<bool, FunctionError> {
        let mut state = self.state.write();
        if !state.groups.contains(group) {
            return Err(FunctionError::UnknownGroup(group.to_string()));
        }
        let memberships = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| FunctionError::UnknownUser(user_id.to_string()))?;
        Ok(memberships.insert(group.to_string()))
    }

    fn groups_of(&self, user_id: &str) -> Result<Vec<String>, FunctionError> {
        self.state
            .read()
            .users
            .get(user_id)
            .map(|groups| groups.iter().cloned().collect())
            .ok_or_else(|| FunctionError::UnknownUser(user_id.to_string()))
    }
}

/// Handler adding a user to a group.
pub struct AddUserToGroup {
    directory: Arc<dyn IdentityDirectory>,
}

impl AddUserToGroup {
    /// Create the handler over a directory.
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }
}

impl FunctionHandler for AddUserToGroup {
    fn name(&self) -> &str {
        ADD_USER_TO_GROUP
    }

    fn invoke(
        &self,
        caller: &SecurityContext,
        arguments: &Map<String, JsonValue>,
    ) -> Result<JsonValue, FunctionError> {
        let user_id = string_argument(arguments, "userId")?;
        let group = string_argument(arguments, "groupName")?;

        let added = self.directory.add_user_to_group(user_id, group)?;
        tracing::info!(
            caller = %caller.describe(),
            user_id,
            group,
            added,
            "group membership updated"
        );

        Ok(json!({
            "userId": user_id,
            "groupName": group,
            "status": if added { "added" } else { "alreadyMember" },
        }))
    }
}

fn string_argument<'a>(arguments: &'a Map<String, JsonValue>, name: &str) -> Result<&'a str, FunctionError> {
    match arguments.get(name).and_then(JsonValue::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FunctionError::InvalidArguments(format!("{} must be a non-empty string", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Arc<MemoryDirectory> {
        Arc::new(
            MemoryDirectory::new()
                .with_group("ADMINS")
                .with_group("STAFF")
                .with_user("u-1"),
        )
    }

    fn args(user: &str, group: &str) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("userId".into(), json!(user));
        map.insert("groupName".into(), json!(group));
        map
    }

    #[test]
    fn test_add_then_already_member() {
        let dir = directory();
        let handler = AddUserToGroup::new(dir.clone());
        let admin = SecurityContext::user("admin", ["ADMINS"]);

        let first = handler.invoke(&admin, &args("u-1", "STAFF")).unwrap();
        assert_eq!(
            first,
            json!({"userId": "u-1", "groupName": "STAFF", "status": "added"})
        );

        let second = handler.invoke(&admin, &args("u-1", "STAFF")).unwrap();
        assert_eq!(second["status"], "alreadyMember");
        assert_eq!(dir.groups_of("u-1").unwrap(), vec!["STAFF"]);
    }

    #[test]
    fn test_unknown_user_and_group() {
        let handler = AddUserToGroup::new(directory());
        let admin = SecurityContext::user("admin", ["ADMINS"]);

        assert_eq!(
            handler.invoke(&admin, &args("ghost", "STAFF")),
            Err(FunctionError::UnknownUser("ghost".into()))
        );
        assert_eq!(
            handler.invoke(&admin, &args("u-1", "TUTORS")),
            Err(FunctionError::UnknownGroup("TUTORS".into()))
        );
    }

    #[test]
    fn test_empty_argument_rejected() {
        let handler = AddUserToGroup::new(directory());
        let admin = SecurityContext::user("admin", ["ADMINS"]);

        assert!(matches!(
            handler.invoke(&admin, &args("", "STAFF")),
            Err(FunctionError::InvalidArguments(_))
        ));
    }
}
