//! The resolved identity attached to a request once a bearer token (or
//! anonymous fallback) has been processed.

use serde::{Deserialize, Serialize};

/// An authenticated user, as resolved from JWT claims (or, for tests,
/// constructed directly from a directory lookup). Carries exactly the
/// attributes ACL expressions match against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub uid: String,
    pub short_names: Vec<String>,
    pub groups: Vec<String>,
}

impl AuthenticatedUser {
    pub fn new(uid: impl Into<String>, short_names: Vec<String>, groups: Vec<String>) -> Self {
        Self {
            uid: uid.into(),
            short_names,
            groups,
        }
    }

    pub fn has_short_name(&self, name: &str) -> bool {
        self.short_names.iter().any(|n| n == name)
    }
}

/// The request's resolved identity: either a concrete user, or anonymous.
///
/// Handlers that don't require authentication proceed with `Anonymous`;
/// authorization checks that need an identity fail against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdentity {
    Anonymous,
    User(AuthenticatedUser),
}

impl RequestIdentity {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            RequestIdentity::Anonymous => None,
            RequestIdentity::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, RequestIdentity::User(_))
    }
}
