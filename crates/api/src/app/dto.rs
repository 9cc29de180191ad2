//! Wire shapes that don't round-trip cleanly through the domain types
//! themselves — mostly partial "new entity" request bodies, where the
//! client omits fields (`created`, `number`, `version`) the store assigns.
//!
//! Everything else (an `Incident`, a `FieldReport`, a `Location`, ...)
//! already carries the right `#[serde(...)]` shape in `ims-domain` and is
//! serialized/deserialized directly by the route handlers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ims_domain::{IncidentState, Location, Priority};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReportEntryRequest {
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncidentRequest {
    /// Present on the wire so the server can reject an event mismatch;
    /// never trusted over the URL's own event id.
    pub event: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub state: Option<IncidentState>,
    pub summary: Option<String>,
    pub location: Option<Location>,
    #[serde(default)]
    pub ranger_handles: BTreeSet<String>,
    #[serde(default)]
    pub incident_types: BTreeSet<String>,
    #[serde(default)]
    pub report_entries: Vec<NewReportEntryRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFieldReportRequest {
    pub event: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub incident: Option<u32>,
    #[serde(default)]
    pub report_entries: Vec<NewReportEntryRequest>,
}

/// `POST /ims/api/incident_types/` body.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IncidentTypeEditRequest {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub show: Vec<String>,
    #[serde(default)]
    pub hide: Vec<String>,
}

/// One event's entry in the `POST /ims/api/access` body: `{readers:[...],
/// writers:[...]}`, either key optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AccessEditEntry {
    pub readers: Option<Vec<String>>,
    pub writers: Option<Vec<String>>,
}

/// `POST /ims/api/auth/login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}
