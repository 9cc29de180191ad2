//! `POST /ims/api/auth/login` — exchanges directory credentials for a
//! bearer token (spec §4.D: "issues a bearer token signed with a
//! JSON-Web-Key on login").

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use ims_config::Config;

use crate::app::dto::LoginRequest;
use crate::app::errors::ApiError;

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
}

pub async fn login(
    State(config): State<Arc<Config>>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = ims_auth::authenticate(
        config.directory.as_ref(),
        &body.identifier,
        &body.password,
        config.master_key.as_deref(),
    )
    .await?;

    let token = config
        .signing_key
        .issue(&user, Utc::now())
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    Ok(Json(LoginResponse { token }).into_response())
}
