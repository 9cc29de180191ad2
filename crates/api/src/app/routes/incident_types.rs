//! `/ims/api/incident_types/` — the process-wide incident-type catalog.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use ims_auth::Capabilities;
use ims_config::Config;

use crate::app::authz::{authorize, require_user};
use crate::app::dto::IncidentTypeEditRequest;
use crate::app::errors::ApiError;
use crate::app::listing::json_array_response;
use crate::context::IdentityContext;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub hidden: Option<String>,
}

/// `GET` — any authenticated user may list; `?hidden=true` includes hidden
/// types (spec §6 query parameters). Emits bare names (spec §4.B:
/// `incidentTypes(includeHidden) -> [name]`); the `{name, hidden}` shape is
/// only used inside the export document.
pub async fn list(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    require_user(&identity)?;
    let include_hidden = query.hidden.as_deref() == Some("true");
    let types = config.store.incident_types(include_hidden).await?;
    let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
    Ok(json_array_response(&names).into_response())
}

/// `POST` — admin-only add/show/hide batch edit.
pub async fn edit(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Json(edits): Json<IncidentTypeEditRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;

    for name in &edits.add {
        config.store.create_incident_type(name, false).await?;
    }
    if !edits.show.is_empty() {
        config.store.show_incident_types(&edits.show).await?;
    }
    if !edits.hide.is_empty() {
        config.store.hide_incident_types(&edits.hide).await?;
    }

    Ok(axum::http::StatusCode::NO_CONTENT)
}
