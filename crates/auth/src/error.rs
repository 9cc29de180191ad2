//! The three error classes the auth provider raises; the API layer maps
//! these to HTTP 401/403/401-for-login.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No valid identity was present when one was required.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A known identity lacks the capability the endpoint requires.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Login failed: unknown user, inactive account, or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
}
