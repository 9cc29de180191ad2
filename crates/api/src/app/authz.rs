//! Shared authentication/authorization glue used by every route handler.

use ims_auth::{AuthenticatedUser, Capabilities, RequestIdentity};
use ims_config::Config;
use ims_core::EventId;

use super::errors::ApiError;
use crate::context::IdentityContext;

/// Requires an authenticated identity, per spec §4.F step 1/3: handlers
/// that need one reject anonymous requests with `401`.
pub fn require_user(identity: &IdentityContext) -> Result<&AuthenticatedUser, ApiError> {
    identity.identity().user().ok_or(ApiError::Unauthenticated)
}

/// Computes the requesting identity's capability set for `event`, fetching
/// that event's ACL from the store. Anonymous requests get an empty set
/// (no baseline, no admin) rather than an error — callers decide whether
/// the endpoint tolerates that.
pub async fn capabilities_for(
    config: &Config,
    identity: &IdentityContext,
    event: Option<&EventId>,
) -> Result<Capabilities, ApiError> {
    let user = match identity.identity().user() {
        Some(user) => user,
        None => return Ok(Capabilities::empty()),
    };
    capabilities_for_user(config, user, event).await
}

pub async fn capabilities_for_user(
    config: &Config,
    user: &AuthenticatedUser,
    event: Option<&EventId>,
) -> Result<Capabilities, ApiError> {
    let access = match event {
        Some(event) => {
            let readers = config.store.readers(event).await?;
            let writers = config.store.writers(event).await?;
            let reporters = config.store.reporters(event).await?;
            let mut access = ims_domain::EventAccess::new();
            access.readers = readers;
            access.writers = writers;
            access.reporters = reporters;
            Some(access)
        }
        None => None,
    };
    Ok(ims_auth::authorizations_for(user, &config.admins, access.as_ref()))
}

pub fn require_capability(caps: Capabilities, required: Capabilities) -> Result<(), ApiError> {
    if caps.contains(required) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("missing required capability: {required:?}")))
    }
}

/// Requires an authenticated user and that their event-scoped capabilities
/// (or process-wide `IMS_ADMIN`) contain `required`.
pub async fn authorize(
    config: &Config,
    identity: &IdentityContext,
    event: Option<&EventId>,
    required: Capabilities,
) -> Result<AuthenticatedUser, ApiError> {
    let user = require_user(identity)?.clone();
    let caps = capabilities_for_user(config, &user, event).await?;
    if caps.contains(Capabilities::IMS_ADMIN) || caps.contains(required) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden(format!("missing required capability: {required:?}")))
    }
}

/// `RequestIdentity::Anonymous` check used by handlers that tolerate (but
/// don't require) an identity, matching spec §4.D's baseline-capability
/// grant to any authenticated user.
pub fn is_anonymous(identity: &IdentityContext) -> bool {
    matches!(identity.identity(), RequestIdentity::Anonymous)
}
