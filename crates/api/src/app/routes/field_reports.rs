//! `/ims/api/events/<id>/field_reports/` and
//! `/ims/api/events/<id>/field_reports/<n>`.
//!
//! Read access to an attached report follows the incident it's attached
//! to; an unattached report falls back to the baseline
//! `READ_INCIDENT_REPORTS` capability (spec §4.D step 4, §8 property 5).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use ims_auth::Capabilities;
use ims_config::Config;
use ims_core::{EventId, FieldReportNumber, IncidentNumber};
use ims_domain::{FieldReport, ReportEntry};

use crate::app::authz::{authorize, capabilities_for, require_user};
use crate::app::dto::NewFieldReportRequest;
use crate::app::edit::{apply_edit, decode_opt_json};
use crate::app::errors::ApiError;
use crate::app::listing::{json_array_response, json_object_response};
use crate::context::IdentityContext;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Filters to field reports attached to this incident number (spec §6's
    /// `incident` query parameter on the field-reports list).
    pub incident: Option<u32>,
}

pub async fn list(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path(event_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    require_user(&identity)?;
    let caps = capabilities_for(&config, &identity, Some(&event)).await?;

    let reports = config.store.field_reports(&event).await?;
    let mut visible = Vec::with_capacity(reports.len());
    for report in reports {
        if let Some(wanted) = query.incident {
            if report.incident.map(|n| n.get()) != Some(wanted) {
                continue;
            }
        }
        let attached_readable = if caps.contains(Capabilities::READ_INCIDENTS) {
            report.incident.is_some()
        } else {
            false
        };
        if ims_auth::can_read_field_report(caps, attached_readable)
            || caps.contains(Capabilities::IMS_ADMIN)
        {
            visible.push(report);
        }
    }
    Ok(json_array_response(&visible).into_response())
}

pub async fn create(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path(event_id): Path<String>,
    Json(body): Json<NewFieldReportRequest>,
) -> Result<Response, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    let user = authorize(&config, &identity, Some(&event), Capabilities::WRITE_INCIDENT_REPORTS).await?;

    if let Some(requested_event) = &body.event {
        if requested_event != event.as_str() {
            return Err(ApiError::bad_request(format!(
                "field report's event {requested_event} does not match event in URL {event}"
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

    let mut report = FieldReport::new(event.clone(), FieldReportNumber::new(1).unwrap(), created);
    report.summary = body.summary;
    report.report_entries = entries;
    if let Some(incident) = body.incident {
        report.incident = Some(IncidentNumber::new(incident).map_err(ApiError::from)?);
    }
    report.validate()?;

    let stored = config.store.create_field_report(report, &author).await?;

    let location = format!("/ims/api/events/{}/field_reports/{}", event, stored.number);
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(
        "Incident-Report-Number",
        HeaderValue::from_str(&stored.number.to_string()).unwrap(),
    );
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
    require_user(&identity)?;
    let caps = capabilities_for(&config, &identity, Some(&event)).await?;
    let number: FieldReportNumber = number.parse().map_err(|_| ApiError::NotFound)?;
    let report = config
        .store
        .field_report_with_number(&event, number)
        .await?
        .ok_or(ApiError::NotFound)?;

    let attached_readable = caps.contains(Capabilities::READ_INCIDENTS) && report.incident.is_some();
    if !caps.contains(Capabilities::IMS_ADMIN) && !ims_auth::can_read_field_report(caps, attached_readable) {
        return Err(ApiError::Forbidden("not authorized to read this field report".to_string()));
    }

    Ok(json_object_response(&report).into_response())
}

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    pub action: Option<String>,
    pub incident: Option<String>,
}

pub async fn edit(
    State(config): State<Arc<Config>>,
    Extension(identity): Extension<IdentityContext>,
    Path((event_id, number)): Path<(String, String)>,
    Query(query): Query<EditQuery>,
    Json(edits): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let event = EventId::new(event_id).map_err(ApiError::from)?;
    let user = authorize(&config, &identity, Some(&event), Capabilities::WRITE_INCIDENT_REPORTS).await?;
    let author = user
        .short_names
        .first()
        .ok_or_else(|| ApiError::Forbidden("user has no short name".to_string()))?
        .clone();
    let number: FieldReportNumber = number.parse().map_err(|_| ApiError::NotFound)?;

    if let Some(action) = &query.action {
        let incident_text = query
            .incident
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("missing required query parameter: incident"))?;
        let incident_number: IncidentNumber = incident_text
            .parse()
            .map_err(|_| ApiError::bad_request(format!("invalid incident number: {incident_text}")))?;

        match action.as_str() {
            "attach" => {
                config
                    .store
                    .attach_field_report_to_incident(&event, number, incident_number, &author)
                    .await?;
            }
            "detach" => {
                config
                    .store
                    .detach_field_report_from_incident(&event, number, &author)
                    .await?;
            }
            other => return Err(ApiError::bad_request(format!("invalid action: {other}"))),
        }
    }

    let edits = edits.as_object().ok_or_else(|| ApiError::bad_request("field report edit must be a JSON object"))?;

    if let Some(value) = edits.get("number") {
        if value.as_u64() != Some(number.get() as u64) {
            return Err(ApiError::bad_request("field report number may not be modified"));
        }
    }
    if edits.contains_key("created") {
        return Err(ApiError::bad_request("field report created time may not be modified"));
    }

    let store = &config.store;

    apply_edit(edits, "summary", decode_opt_json, |value: Option<String>| {
        store.set_field_report_summary(&event, number, value, &author)
    })
    .await?;

    if let Some(entries) = edits.get("report_entries") {
        let entries: Vec<crate::app::dto::NewReportEntryRequest> = crate::app::edit::decode_json(entries)?;
        let now = Utc::now();
        let entries: Vec<ReportEntry> = entries
            .into_iter()
            .map(|entry| ReportEntry::new(author.clone(), entry.created.unwrap_or(now), entry.text, false))
            .collect();
        store.add_report_entries_to_field_report(&event, number, entries, &author).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
