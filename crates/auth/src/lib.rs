//! Authentication and per-event authorization: bearer tokens, the six-flag
//! capability set, and ACL-expression matching against [`ims_domain::EventAccess`].

pub mod authorize;
pub mod capability;
pub mod error;
pub mod jwt;
pub mod login;
pub mod principal;

pub use authorize::{authorizations_for, can_read_field_report, reporter_match};
pub use capability::Capabilities;
pub use error::AuthError;
pub use jwt::{ImsClaims, SigningKey, TokenError};
pub use login::authenticate;
pub use principal::{AuthenticatedUser, RequestIdentity};
