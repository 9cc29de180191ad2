//! `/ims/api/events/` and `/ims/api/events/<id>/locations/`.
//!
//! Event creation/listing isn't walked through in the reference handlers
//! the way incident/field-report endpoints are, but spec §4.F's URL shape
//! names both `events/` and `events/<id>/`; gated `IMS_ADMIN` like the
//! other process-wide catalogs (incident types, access, streets).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use ims_auth::Capabilities;
use ims_config::Config;
use ims_core::EventId;

use crate::app::authz::authorize;
use crate::app::errors::ApiError;
use crate::app::listing::json_array_response;
use crate::context::IdentityContext;

#[derive(Debug, Deserialize)]
pub struct NewEventRequest {
    pub id: String,
}

pub async fn list(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
) -> Result<Response, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;
    let events = config.store.events().await?;
    let ids: Vec<String> = events.iter().map(|e| e.as_str().to_string()).collect();
    Ok(json_array_response(&ids).into_response())
}

pub async fn create(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Json(body): Json<NewEventRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;
    let event = EventId::new(body.id).map_err(ApiError::from)?;
    config.store.create_event(&event).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Per-event known-location reference list. The source vends a static
/// `locations.json` sibling file here (a config-loading concern this spec
/// puts out of scope); the closest thing the core itself owns is the
/// event's concentric-street dictionary, so that's what this serves.
pub async fn locations(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path(event_id): Path<String>,
) -> Result<Response, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    authorize(&config, &identity, Some(&event), Capabilities::READ_INCIDENTS).await?;
    let streets = config.store.concentric_streets(&event).await?;
    Ok(axum::Json(streets).into_response())
}
