//! The portable export/import document: the full logical state of a store.

use std::collections::BTreeMap;

use ims_core::{ConcentricStreetId, EventId};
use serde::{Deserialize, Serialize};

use crate::access::EventAccess;
use crate::field_report::FieldReport;
use crate::incident::Incident;
use crate::incident_type::IncidentType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEvent {
    pub event: EventId,
    pub access: EventAccess,
    pub concentric_streets: BTreeMap<ConcentricStreetId, String>,
    pub incidents: Vec<Incident>,
    pub incident_reports: Vec<FieldReport>,
}

/// `{incident_types, events:[{event, access, concentric_streets, incidents,
/// incident_reports}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImsExport {
    pub incident_types: Vec<IncidentType>,
    pub events: Vec<ExportedEvent>,
}

impl ImsExport {
    pub fn new() -> Self {
        Self {
            incident_types: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl Default for ImsExport {
    fn default() -> Self {
        Self::new()
    }
}
