//! Request-scoped extension types the auth middleware attaches, and that
//! handlers pull back out via `Extension<..>`.

use ims_auth::RequestIdentity;

/// The request's resolved identity, attached by [`crate::middleware::auth_middleware`]
/// on every request regardless of whether a bearer token was present.
/// Anonymous requests proceed; it's up to each handler's authorization
/// check to reject them where an identity is actually required.
#[derive(Debug, Clone)]
pub struct IdentityContext(pub RequestIdentity);

impl IdentityContext {
    pub fn identity(&self) -> &RequestIdentity {
        &self.0
    }
}
