//! Directory-resident user record.

use serde::{Deserialize, Serialize};

/// A user as seen by the directory: immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Short names (usernames); at least one.
    pub short_names: Vec<String>,
    pub groups: Vec<String>,
    pub active: bool,
    pub uid: String,
    /// Salted password hash (PHC string format), never the plaintext.
    pub password_hash: Option<String>,
}

impl DirectoryUser {
    pub fn has_short_name(&self, name: &str) -> bool {
        self.short_names.iter().any(|n| n == name)
    }
}

/// Lightweight personnel roster entry for the `personnel` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranger {
    pub handle: String,
    pub email: Option<String>,
    pub status: String,
}
