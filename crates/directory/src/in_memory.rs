//! Test/demo directory backend: a fixed roster held in memory.
//!
//! Grounded on the YAML backend's shape below, minus the file I/O: useful
//! for unit tests and for a deployment that wants to wire a static roster
//! without parsing a file at all.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::password;
use crate::user::{DirectoryUser, Ranger};
use crate::PersonnelDirectory;

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, DirectoryUser>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self { users: HashMap::new() }
    }

    /// Inserts (or replaces) a user, indexed by every one of its short names.
    pub fn insert(&mut self, user: DirectoryUser) {
        for name in &user.short_names {
            self.users.insert(name.clone(), user.clone());
        }
    }

    /// Convenience constructor for tests: a user with one short name, no
    /// groups, an already-hashed password.
    pub fn with_user(mut self, short_name: &str, groups: &[&str], plaintext_password: &str) -> Self {
        let hash = password::hash_password(plaintext_password).expect("hash in test fixture");
        self.insert(DirectoryUser {
            short_names: vec![short_name.to_string()],
            groups: groups.iter().map(|s| s.to_string()).collect(),
            active: true,
            uid: short_name.to_string(),
            password_hash: Some(hash),
        });
        self
    }
}

#[async_trait]
impl PersonnelDirectory for InMemoryDirectory {
    async fn lookup_user(&self, search_term: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        Ok(self.users.get(search_term).cloned())
    }

    async fn personnel(&self) -> Result<Vec<Ranger>, DirectoryError> {
        let mut seen = std::collections::HashSet::new();
        let mut rangers = Vec::new();
        for user in self.users.values() {
            if seen.insert(user.uid.clone()) {
                rangers.push(Ranger {
                    handle: user.short_names.first().cloned().unwrap_or_default(),
                    email: None,
                    status: if user.active { "active".to_string() } else { "inactive".to_string() },
                });
            }
        }
        rangers.sort_by(|a, b| a.handle.cmp(&b.handle));
        Ok(rangers)
    }

    async fn verify_password(&self, user: &DirectoryUser, plaintext: &str) -> Result<bool, DirectoryError> {
        match &user.password_hash {
            Some(hash) => password::verify_password(plaintext, hash),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_finds_by_any_short_name() {
        let directory = InMemoryDirectory::new().with_user("alice", &["dispatch"], "hunter2");
        let found = directory.lookup_user("alice").await.unwrap();
        assert!(found.is_some());
        assert!(directory.lookup_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verify_password_matches_only_correct_plaintext() {
        let directory = InMemoryDirectory::new().with_user("alice", &[], "hunter2");
        let alice = directory.lookup_user("alice").await.unwrap().unwrap();
        assert!(directory.verify_password(&alice, "hunter2").await.unwrap());
        assert!(!directory.verify_password(&alice, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn personnel_deduplicates_by_uid() {
        let directory = InMemoryDirectory::new().with_user("alice", &[], "x");
        let roster = directory.personnel().await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].handle, "alice");
    }
}
