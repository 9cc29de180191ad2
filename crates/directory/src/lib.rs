//! Personnel directory: the interface the core uses to look up users and
//! verify passwords.
//!
//! This crate only specifies and implements the interface; the transport to
//! an external directory service (LDAP, a web API, ...) is out of scope and
//! left to whichever backend a deployment wires in.

pub mod error;
pub mod in_memory;
pub mod password;
pub mod user;
pub mod yaml;

pub use error::DirectoryError;
pub use user::{DirectoryUser, Ranger};

use async_trait::async_trait;

/// The interface the core requires of a personnel directory.
#[async_trait]
pub trait PersonnelDirectory: Send + Sync {
    /// Looks up a user by a short name or email search term.
    async fn lookup_user(&self, search_term: &str) -> Result<Option<DirectoryUser>, DirectoryError>;

    /// Lists all personnel, for the personnel endpoint.
    async fn personnel(&self) -> Result<Vec<Ranger>, DirectoryError>;

    /// Verifies a plaintext password against the user's stored hash.
    async fn verify_password(&self, user: &DirectoryUser, plaintext: &str) -> Result<bool, DirectoryError>;
}
