//! In-memory identity backend for tests. Mirrors the directory rules that
//! matter here: names are unique, and a user with keys or group memberships
//! cannot be deleted.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{Result, SchedLoadError};
use crate::identity::{AccountDetails, Credentials, IdentityBackend};

#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub path: String,
    pub groups: Vec<String>,
    pub keys: Vec<String>,
}

#[derive(Default)]
struct State {
    users: BTreeMap<String, UserRecord>,
    caller: Option<AccountDetails>,
    fail_on: Option<&'static str>,
    deny_lookups: bool,
    issued: usize,
    calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct MemoryIdentity {
    state: Mutex<State>,
}

impl MemoryIdentity {
    pub fn new(caller: AccountDetails) -> Self {
        let identity = Self::default();
        identity.state.lock().unwrap().caller = Some(caller);
        identity
    }

    /// Fail every call to `operation` with a provider error
    pub fn fail_on(&self, operation: &'static str) {
        self.state.lock().unwrap().fail_on = Some(operation);
    }

    /// Answer user lookups with AccessDenied
    pub fn deny_lookups(&self) {
        self.state.lock().unwrap().deny_lookups = true;
    }

    pub fn add_user(&self, user: &str, record: UserRecord) {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(user.to_string(), record);
    }

    pub fn user(&self, user: &str) -> Option<UserRecord> {
        self.state.lock().unwrap().users.get(user).cloned()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation);
        if state.fail_on == Some(operation) {
            return Err(SchedLoadError::identity(operation, "injected failure"));
        }
        Ok(state)
    }
}

fn no_such_entity(operation: &'static str, user: &str) -> SchedLoadError {
    SchedLoadError::identity(operation, format!("NoSuchEntity: {}", user))
}

#[async_trait]
impl IdentityBackend for MemoryIdentity {
    async fn user_exists(&self, user: &str) -> Result<bool> {
        let state = self.enter("GetUser")?;
        if state.deny_lookups {
            return Ok(false);
        }
        Ok(state.users.contains_key(user))
    }

    async fn create_user(&self, user: &str, path: &str) -> Result<()> {
        let mut state = self.enter("CreateUser")?;
        if state.users.contains_key(user) {
            return Err(SchedLoadError::identity(
                "CreateUser",
                format!("EntityAlreadyExists: {}", user),
            ));
        }
        state.users.insert(
            user.to_string(),
            UserRecord {
                path: path.to_string(),
                ..UserRecord::default()
            },
        );
        Ok(())
    }

    async fn delete_user(&self, user: &str) -> Result<()> {
        let mut state = self.enter("DeleteUser")?;
        let record = state
            .users
            .get(user)
            .ok_or_else(|| no_such_entity("DeleteUser", user))?;
        if !record.keys.is_empty() || !record.groups.is_empty() {
            return Err(SchedLoadError::identity(
                "DeleteUser",
                format!("DeleteConflict: {} still has keys or groups", user),
            ));
        }
        state.users.remove(user);
        Ok(())
    }

    async fn add_user_to_group(&self, user: &str, group: &str) -> Result<()> {
        let mut state = self.enter("AddUserToGroup")?;
        let record = state
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_entity("AddUserToGroup", user))?;
        if !record.groups.iter().any(|g| g == group) {
            record.groups.push(group.to_string());
        }
        Ok(())
    }

    async fn remove_user_from_group(&self, user: &str, group: &str) -> Result<()> {
        let mut state = self.enter("RemoveUserFromGroup")?;
        let record = state
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_entity("RemoveUserFromGroup", user))?;
        let before = record.groups.len();
        record.groups.retain(|g| g != group);
        if record.groups.len() == before {
            return Err(no_such_entity("RemoveUserFromGroup", group));
        }
        Ok(())
    }

    async fn is_user_in_group(&self, user: &str, group: &str) -> Result<bool> {
        let state = self.enter("ListGroupsForUser")?;
        let record = state
            .users
            .get(user)
            .ok_or_else(|| no_such_entity("ListGroupsForUser", user))?;
        Ok(record.groups.iter().any(|g| g == group))
    }

    async fn create_access_key(&self, user: &str) -> Result<Credentials> {
        let mut state = self.enter("CreateAccessKey")?;
        state.issued += 1;
        let key_id = format!("AKIA{:04}", state.issued);
        let record = state
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_entity("CreateAccessKey", user))?;
        record.keys.push(key_id.clone());
        Ok(Credentials {
            access_key_id: key_id,
            secret_access_key: format!("secret-for-{}", user),
        })
    }

    async fn list_access_key_ids(&self, user: &str) -> Result<Vec<String>> {
        let state = self.enter("ListAccessKeys")?;
        let record = state
            .users
            .get(user)
            .ok_or_else(|| no_such_entity("ListAccessKeys", user))?;
        Ok(record.keys.clone())
    }

    async fn delete_access_key(&self, user: &str, key_id: &str) -> Result<()> {
        let mut state = self.enter("DeleteAccessKey")?;
        let record = state
            .users
            .get_mut(user)
            .ok_or_else(|| no_such_entity("DeleteAccessKey", user))?;
        record.keys.retain(|k| k != key_id);
        Ok(())
    }

    async fn caller_identity(&self) -> Result<AccountDetails> {
        let state = self.enter("GetCallerIdentity")?;
        state
            .caller
            .clone()
            .ok_or_else(|| SchedLoadError::identity("GetCallerIdentity", "InvalidClientTokenId"))
    }
}
