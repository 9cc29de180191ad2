//! `/ims/api/access` and `/ims/api/streets` — `IMS_ADMIN`-only endpoints
//! that operate across every event at once.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use ims_auth::Capabilities;
use ims_config::Config;
use ims_core::{ConcentricStreetId, EventId};
use ims_domain::AclExpression;

use crate::app::authz::authorize;
use crate::app::dto::AccessEditEntry;
use crate::app::errors::ApiError;
use crate::context::IdentityContext;

#[derive(Debug, Serialize)]
struct EventAccessView {
    readers: Vec<String>,
    writers: Vec<String>,
}

pub async fn read_access(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
) -> Result<Response, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;

    let mut acl: BTreeMap<String, EventAccessView> = BTreeMap::new();
    for event in config.store.events().await? {
        let readers = config.store.readers(&event).await?;
        let writers = config.store.writers(&event).await?;
        acl.insert(
            event.as_str().to_string(),
            EventAccessView {
                readers: readers.iter().map(|e| e.as_str().to_string()).collect(),
                writers: writers.iter().map(|e| e.as_str().to_string()).collect(),
            },
        );
    }
    Ok(Json(acl).into_response())
}

pub async fn edit_access(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Json(edits): Json<BTreeMap<String, AccessEditEntry>>,
) -> Result<StatusCode, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;

    for (event_id, entry) in edits {
        let event = EventId::new(event_id).map_err(ApiError::from)?;
        if let Some(readers) = entry.readers {
            let readers = parse_expressions(readers)?;
            config.store.set_readers(&event, readers).await?;
        }
        if let Some(writers) = entry.writers {
            let writers = parse_expressions(writers)?;
            config.store.set_writers(&event, writers).await?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

fn parse_expressions(raw: Vec<String>) -> Result<std::collections::BTreeSet<AclExpression>, ApiError> {
    raw.into_iter()
        .map(|expr| AclExpression::new(expr).map_err(ApiError::from))
        .collect()
}

pub async fn read_streets(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
) -> Result<Response, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;

    let mut streets: BTreeMap<String, BTreeMap<ConcentricStreetId, String>> = BTreeMap::new();
    for event in config.store.events().await? {
        let event_streets = config.store.concentric_streets(&event).await?;
        streets.insert(event.as_str().to_string(), event_streets);
    }
    Ok(Json(streets).into_response())
}

/// Streets are add-only: an edit that would remove an existing id from any
/// event is rejected wholesale before any write happens.
pub async fn edit_streets(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Json(edits): Json<BTreeMap<String, BTreeMap<String, String>>>,
) -> Result<StatusCode, ApiError> {
    authorize(&config, &identity, None, Capabilities::IMS_ADMIN).await?;

    let mut parsed: Vec<(EventId, BTreeMap<ConcentricStreetId, String>)> = Vec::with_capacity(edits.len());
    for (event_id, streets) in edits {
        let event = EventId::new(event_id).map_err(ApiError::from)?;
        let existing = config.store.concentric_streets(&event).await?;

        let mut submitted = BTreeMap::new();
        for (street_id, name) in streets {
            submitted.insert(ConcentricStreetId::new(street_id).map_err(ApiError::from)?, name);
        }

        for existing_id in existing.keys() {
            if !submitted.contains_key(existing_id) {
                return Err(ApiError::bad_request("removal of streets is not allowed"));
            }
        }

        parsed.push((event, submitted));
    }

    for (event, submitted) in parsed {
        let existing = config.store.concentric_streets(&event).await?;
        for (street_id, name) in submitted {
            if !existing.contains_key(&street_id) {
                config.store.create_concentric_street(&event, &street_id, &name).await?;
            }
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
