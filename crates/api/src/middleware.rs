//! Bearer-token extraction.
//!
//! Per spec §4.D: if no token is present, or it fails to validate, the
//! request proceeds as anonymous rather than being rejected outright — it's
//! up to each handler's own authorization check to reject an anonymous
//! caller where an identity is actually required.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use ims_auth::{AuthenticatedUser, RequestIdentity};
use ims_config::Config;

use crate::context::IdentityContext;

pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = extract_identity(&config, &request);
    request.extensions_mut().insert(IdentityContext(identity));
    next.run(request).await
}

fn extract_identity(config: &Config, request: &Request<axum::body::Body>) -> RequestIdentity {
    let token = match bearer_token(request) {
        Some(token) => token,
        None => return RequestIdentity::Anonymous,
    };

    match config.signing_key.validate(token, Utc::now()) {
        Ok(claims) => RequestIdentity::User(AuthenticatedUser::from(&claims)),
        Err(err) => {
            tracing::debug!(error = %err, "bearer token rejected, proceeding as anonymous");
            RequestIdentity::Anonymous
        }
    }
}

fn bearer_token(request: &Request<axum::body::Body>) -> Option<&str> {
    let header = request.headers().get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request_with_auth(value: Option<&str>) -> Request<axum::body::Body> {
        let mut request = Request::new(axum::body::Body::empty());
        if let Some(value) = value {
            request
                .headers_mut()
                .insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        request
    }

    #[test]
    fn missing_header_has_no_token() {
        assert_eq!(bearer_token(&request_with_auth(None)), None);
    }

    #[test]
    fn non_bearer_scheme_has_no_token() {
        assert_eq!(bearer_token(&request_with_auth(Some("Basic dXNlcjpwYXNz"))), None);
    }

    #[test]
    fn bearer_scheme_extracts_token() {
        assert_eq!(bearer_token(&request_with_auth(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
    }
}
