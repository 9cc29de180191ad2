//! `GET /ims/api/personnel/` — the roster endpoint.
//!
//! Requires `READ_PERSONNEL`, which is part of every authenticated user's
//! baseline (spec §4.D.1); a directory outage degrades to an empty list
//! rather than failing the request (spec §7's `DirectoryFailure` policy).

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Extension;

use ims_auth::Capabilities;
use ims_config::Config;

use crate::app::authz::authorize;
use crate::app::errors::ApiError;
use crate::app::listing::json_array_response;
use crate::context::IdentityContext;

pub async fn personnel(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
) -> Result<Response, ApiError> {
    authorize(&config, &identity, None, Capabilities::READ_PERSONNEL).await?;

    let roster = match config.directory.personnel().await {
        Ok(roster) => roster,
        Err(err) => {
            tracing::error!(error = %err, "personnel directory unreachable, degrading to empty roster");
            Vec::new()
        }
    };

    Ok(json_array_response(&roster).into_response())
}
