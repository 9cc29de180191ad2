//! YAML-file-backed personnel directory.
//!
//! One of the two reference backends the spec calls out (the other is an
//! external relational backend, left to whatever a deployment wires in
//! behind [`crate::PersonnelDirectory`]). The file is re-read on a refresh
//! interval rather than on every lookup; concurrent refreshes coalesce on a
//! single in-flight request so a cache stampede on expiry only costs one
//! file read.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::DirectoryError;
use crate::user::{DirectoryUser, Ranger};
use crate::PersonnelDirectory;

#[derive(Debug, Deserialize)]
struct YamlRoster {
    #[serde(default)]
    users: Vec<YamlUser>,
}

#[derive(Debug, Deserialize)]
struct YamlUser {
    handle: String,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    password_hash: Option<String>,
}

fn default_active() -> bool {
    true
}

struct Cache {
    by_handle: HashMap<String, DirectoryUser>,
    loaded_at: Instant,
}

/// Personnel directory backed by a YAML roster file, refreshed at most once
/// per `refresh_interval`.
pub struct YamlDirectory {
    path: PathBuf,
    refresh_interval: Duration,
    cache: Mutex<Option<Cache>>,
}

impl YamlDirectory {
    pub fn new(path: impl Into<PathBuf>, refresh_interval: Duration) -> Self {
        Self {
            path: path.into(),
            refresh_interval,
            cache: Mutex::new(None),
        }
    }

    /// Parses a roster from an already-read string; split out so tests don't
    /// need a file on disk.
    fn parse(contents: &str) -> Result<HashMap<String, DirectoryUser>, DirectoryError> {
        let roster: YamlRoster =
            serde_yaml::from_str(contents).map_err(|e| DirectoryError::Malformed(e.to_string()))?;
        let mut by_handle = HashMap::new();
        for user in roster.users {
            let directory_user = DirectoryUser {
                short_names: vec![user.handle.clone()],
                groups: user.groups,
                active: user.active,
                uid: user.handle.clone(),
                password_hash: user.password_hash,
            };
            by_handle.insert(user.handle, directory_user);
        }
        Ok(by_handle)
    }

    /// Returns the current roster, reloading from disk if the cache is
    /// absent or stale. A `Mutex` around the whole cache slot means
    /// concurrent callers that both observe staleness block on one another
    /// rather than both hitting disk; the second arrival sees the refreshed
    /// cache and returns immediately.
    async fn roster(&self) -> Result<Arc<HashMap<String, DirectoryUser>>, DirectoryError> {
        let mut guard = self.cache.lock().await;
        let stale = match &*guard {
            Some(cache) => cache.loaded_at.elapsed() >= self.refresh_interval,
            None => true,
        };
        if stale {
            let contents = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;
            let by_handle = Self::parse(&contents)?;
            *guard = Some(Cache {
                by_handle,
                loaded_at: Instant::now(),
            });
        }
        Ok(Arc::new(guard.as_ref().expect("just populated").by_handle.clone()))
    }
}

#[async_trait]
impl PersonnelDirectory for YamlDirectory {
    async fn lookup_user(&self, search_term: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        let roster = self.roster().await?;
        Ok(roster.get(search_term).cloned())
    }

    async fn personnel(&self) -> Result<Vec<Ranger>, DirectoryError> {
        let roster = self.roster().await?;
        let mut rangers: Vec<Ranger> = roster
            .values()
            .map(|u| Ranger {
                handle: u.short_names.first().cloned().unwrap_or_default(),
                email: None,
                status: if u.active { "active".to_string() } else { "inactive".to_string() },
            })
            .collect();
        rangers.sort_by(|a, b| a.handle.cmp(&b.handle));
        Ok(rangers)
    }

    async fn verify_password(&self, user: &DirectoryUser, plaintext: &str) -> Result<bool, DirectoryError> {
        match &user.password_hash {
            Some(hash) => crate::password::verify_password(plaintext, hash),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_roster() {
        let yaml = "users:\n  - handle: alice\n    groups: [dispatch]\n";
        let roster = YamlDirectory::parse(yaml).unwrap();
        let alice = roster.get("alice").unwrap();
        assert_eq!(alice.groups, vec!["dispatch".to_string()]);
        assert!(alice.active);
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(YamlDirectory::parse("users: [not, a, mapping").is_err());
    }
}
