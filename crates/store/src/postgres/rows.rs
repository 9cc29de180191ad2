//! Row shapes and column<->domain mapping for the Postgres backend.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ims_core::{ConcentricStreetId, EventId, FieldReportNumber, IncidentNumber};
use ims_domain::{FieldReport, Incident, IncidentState, Location, LocationAddress, Priority, ReportEntry};
use sqlx::{FromRow, Row};

use crate::error::StorageError;

#[derive(FromRow)]
pub struct IncidentRow {
    pub event: String,
    pub number: i32,
    pub version: i64,
    pub created: DateTime<Utc>,
    pub priority: i16,
    pub state: String,
    pub summary: Option<String>,
    pub location_name: Option<String>,
    pub location_type: Option<String>,
    pub location_concentric: Option<String>,
    pub location_radial_hour: Option<i16>,
    pub location_radial_minute: Option<i16>,
    pub location_description: Option<String>,
}

#[derive(FromRow)]
pub struct FieldReportRow {
    pub event: String,
    pub number: i32,
    pub created: DateTime<Utc>,
    pub summary: Option<String>,
}

/// Splits an optional [`Location`] into the five flat columns the `incident`
/// table stores it as.
pub fn location_columns(
    location: &Option<Location>,
) -> (Option<&'static str>, Option<String>, Option<i16>, Option<i16>, Option<String>) {
    match location.as_ref().and_then(|l| l.address.as_ref()) {
        None => (None, None, None, None, None),
        Some(LocationAddress::Text { description }) => (Some("text"), None, None, None, description.clone()),
        Some(LocationAddress::Concentric {
            concentric,
            radial_hour,
            radial_minute,
            description,
        }) => (
            Some("garett"),
            concentric.clone(),
            radial_hour.map(|h| h as i16),
            radial_minute.map(|m| m as i16),
            description.clone(),
        ),
    }
}

fn location_from_columns(row: &IncidentRow) -> Result<Option<Location>, StorageError> {
    if row.location_name.is_none() && row.location_type.is_none() {
        return Ok(None);
    }
    let address = match row.location_type.as_deref() {
        None => None,
        Some("text") => Some(LocationAddress::Text {
            description: row.location_description.clone(),
        }),
        Some("garett") => Some(LocationAddress::Concentric {
            concentric: row.location_concentric.clone(),
            radial_hour: row.location_radial_hour.map(|h| h as u8),
            radial_minute: row.location_radial_minute.map(|m| m as u8),
            description: row.location_description.clone(),
        }),
        Some(other) => return Err(StorageError::Io(format!("unknown location_type column value: {other}"))),
    };
    Ok(Some(Location {
        name: row.location_name.clone(),
        address,
    }))
}

pub fn incident_from_rows(
    row: IncidentRow,
    rangers: BTreeSet<String>,
    incident_types: BTreeSet<String>,
    report_entries: Vec<ReportEntry>,
) -> Result<Incident, StorageError> {
    let event = EventId::new(row.event.clone())?;
    let number = IncidentNumber::new(row.number as u32)?;
    let priority = Priority::new(row.priority as u8)?;
    let state = IncidentState::lookup_by_name(&row.state)?;
    let location = location_from_columns(&row)?;
    Ok(Incident {
        event,
        number,
        version: row.version as u64,
        created: row.created,
        priority,
        state,
        summary: row.summary,
        location,
        ranger_handles: rangers,
        incident_types,
        report_entries,
    })
}

pub fn field_report_from_row(row: FieldReportRow, report_entries: Vec<ReportEntry>) -> Result<FieldReport, StorageError> {
    let event = EventId::new(row.event.clone())?;
    let number = FieldReportNumber::new(row.number as u32)?;
    Ok(FieldReport {
        event,
        number,
        created: row.created,
        summary: row.summary,
        incident: None,
        report_entries,
    })
}

pub fn report_entry_from_row(row: sqlx::postgres::PgRow) -> Result<ReportEntry, StorageError> {
    let author: String = row.try_get("author").map_err(|e| StorageError::Io(e.to_string()))?;
    let text: String = row.try_get("text").map_err(|e| StorageError::Io(e.to_string()))?;
    let created: DateTime<Utc> = row.try_get("created").map_err(|e| StorageError::Io(e.to_string()))?;
    let automatic: bool = row.try_get("generated").map_err(|e| StorageError::Io(e.to_string()))?;
    Ok(ReportEntry::new(author, created, text, automatic))
}
