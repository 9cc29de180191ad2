//! `/ims/api/events/<id>/incidents/` and `/ims/api/events/<id>/incidents/<n>`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use ims_auth::Capabilities;
use ims_config::Config;
use ims_core::{ConcentricStreetId, EventId, IncidentNumber};
use ims_domain::{Incident, ReportEntry};

use crate::app::authz::authorize;
use crate::app::dto::NewIncidentRequest;
use crate::app::edit::{apply_edit, decode_json, decode_opt_json};
use crate::app::errors::ApiError;
use crate::app::listing::{json_array_response, json_object_response};
use crate::context::IdentityContext;

pub async fn list(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path(event_id): Path<String>,
) -> Result<Response, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    authorize(&config, &identity, Some(&event), Capabilities::READ_INCIDENTS).await?;
    let incidents = config.store.incidents(&event).await?;
    Ok(json_array_response(&incidents).into_response())
}

pub async fn create(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path(event_id): Path<String>,
    Json(body): Json<NewIncidentRequest>,
) -> Result<Response, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    let user = authorize(&config, &identity, Some(&event), Capabilities::WRITE_INCIDENTS).await?;

    if let Some(requested_event) = &body.event {
        if requested_event != event.as_str() {
            return Err(ApiError::bad_request(format!(
                "incident's event {requested_event} does not match event in URL {event}"
            )));
        }
    }

    let author = user
        .short_names
        .first()
        .ok_or_else(|| ApiError::Forbidden("user has no short name".to_string()))?
        .clone();
    let now = Utc::now();

    let mut created = body.created;
    let mut entries = Vec::with_capacity(body.report_entries.len());
    for entry in body.report_entries {
        let entry_author = entry.author.unwrap_or_else(|| author.clone());
        let entry_created = entry.created.unwrap_or(now);
        let is_earlier = match created {
            Some(c) => entry_created < c,
            None => true,
        };
        if is_earlier {
            created = Some(entry_created);
        }
        entries.push(ReportEntry::new(entry_author, entry_created, entry.text, false));
    }

    let created = match created {
        Some(created) if created > now => {
            return Err(ApiError::bad_request(format!(
                "created time {created} is in the future; current time is {now}"
            )));
        }
        Some(created) => created,
        None => now,
    };

    let mut incident = Incident::new(event.clone(), IncidentNumber::new(1).unwrap(), created);
    if let Some(priority) = body.priority {
        incident.priority = priority;
    }
    if let Some(state) = body.state {
        incident.state = state;
    }
    incident.summary = body.summary;
    incident.location = body.location;
    incident.ranger_handles = body.ranger_handles;
    incident.incident_types = body.incident_types;
    incident.report_entries = entries;
    incident.validate()?;

    let stored = config.store.create_incident(incident, &author).await?;

    let location = format!("/ims/api/events/{}/incidents/{}", event, stored.number);
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert("Incident-Number", HeaderValue::from_str(&stored.number.to_string()).unwrap());
    response
        .headers_mut()
        .insert(axum::http::header::LOCATION, HeaderValue::from_str(&location).unwrap());
    Ok(response)
}

pub async fn get(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path((event_id, number)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    authorize(&config, &identity, Some(&event), Capabilities::READ_INCIDENTS).await?;
    let number: IncidentNumber = number.parse().map_err(|_| ApiError::NotFound)?;
    let incident = config.store.incident_with_number(&event, number).await?.ok_or(ApiError::NotFound)?;
    Ok(json_object_response(&incident).into_response())
}

pub async fn edit(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path((event_id, number)): Path<(String, String)>,
    Json(edits): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    let user = authorize(&config, &identity, Some(&event), Capabilities::WRITE_INCIDENTS).await?;
    let author = user
        .short_names
        .first()
        .ok_or_else(|| ApiError::Forbidden("user has no short name".to_string()))?
        .clone();
    let number: IncidentNumber = number.parse().map_err(|_| ApiError::NotFound)?;

    let edits = edits.as_object().ok_or_else(|| ApiError::bad_request("incident edit must be a JSON object"))?;

    if let Some(value) = edits.get("number") {
        if value.as_u64() != Some(number.get() as u64) {
            return Err(ApiError::bad_request("incident number may not be modified"));
        }
    }
    if edits.contains_key("created") {
        return Err(ApiError::bad_request("incident created time may not be modified"));
    }

    let store = &config.store;

    apply_edit(edits, "priority", decode_json, |value: ims_domain::Priority| {
        store.set_incident_priority(&event, number, value, &author)
    })
    .await?;

    apply_edit(edits, "state", decode_json, |value: ims_domain::IncidentState| {
        store.set_incident_state(&event, number, value, &author)
    })
    .await?;

    apply_edit(edits, "summary", decode_opt_json, |value: Option<String>| {
        store.set_incident_summary(&event, number, value, &author)
    })
    .await?;

    if let Some(location) = edits.get("location") {
        if location.is_null() {
            store.set_incident_location_name(&event, number, None, &author).await?;
            store.set_incident_location_concentric(&event, number, None, &author).await?;
            store.set_incident_location_radial_hour(&event, number, None, &author).await?;
            store.set_incident_location_radial_minute(&event, number, None, &author).await?;
            store.set_incident_location_description(&event, number, None, &author).await?;
        } else {
            let location = location
                .as_object()
                .ok_or_else(|| ApiError::bad_request("location must be a JSON object"))?;

            apply_edit(location, "name", decode_opt_json, |value: Option<String>| {
                store.set_incident_location_name(&event, number, value, &author)
            })
            .await?;
            apply_edit(
                location,
                "concentric",
                |v| decode_opt_json::<String>(v)?.map(|s| ConcentricStreetId::new(s).map_err(ApiError::from)).transpose(),
                |value: Option<ConcentricStreetId>| store.set_incident_location_concentric(&event, number, value, &author),
            )
            .await?;
            apply_edit(location, "radial_hour", decode_opt_json, |value: Option<u8>| {
                store.set_incident_location_radial_hour(&event, number, value, &author)
            })
            .await?;
            apply_edit(location, "radial_minute", decode_opt_json, |value: Option<u8>| {
                store.set_incident_location_radial_minute(&event, number, value, &author)
            })
            .await?;
            apply_edit(location, "description", decode_opt_json, |value: Option<String>| {
                store.set_incident_location_description(&event, number, value, &author)
            })
            .await?;
        }
    }

    apply_edit(
        edits,
        "ranger_handles",
        decode_json,
        |value: std::collections::BTreeSet<String>| store.set_incident_rangers(&event, number, value, &author),
    )
    .await?;

    apply_edit(
        edits,
        "incident_types",
        decode_json,
        |value: std::collections::BTreeSet<String>| store.set_incident_incident_types(&event, number, value, &author),
    )
    .await?;

    if let Some(entries) = edits.get("report_entries") {
        let entries: Vec<crate::app::dto::NewReportEntryRequest> = decode_json(entries)?;
        let now = Utc::now();
        let entries: Vec<ReportEntry> = entries
            .into_iter()
            .map(|entry| ReportEntry::new(author.clone(), entry.created.unwrap_or(now), entry.text, false))
            .collect();
        store.add_report_entries_to_incident(&event, number, entries, &author).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
