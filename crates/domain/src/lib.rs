//! Dispatch domain: events, incidents, field reports, and the value objects
//! that hang off them.
//!
//! Nothing here talks to a database or an HTTP request; `validate()` is pure
//! and total, and is meant to be re-run on every read back from storage so
//! corruption surfaces immediately rather than propagating silently.

pub mod access;
pub mod export;
pub mod field_report;
pub mod incident;
pub mod incident_type;
pub mod location;
pub mod priority;
pub mod report_entry;
pub mod state;
pub mod street;

pub use access::{AclExpression, AclMode, EventAccess};
pub use export::{ExportedEvent, ImsExport};
pub use field_report::FieldReport;
pub use incident::Incident;
pub use incident_type::{IncidentType, SYSTEM_INCIDENT_TYPES};
pub use location::{Location, LocationAddress};
pub use priority::Priority;
pub use report_entry::ReportEntry;
pub use state::IncidentState;
pub use street::ConcentricStreetDictionary;

use ims_core::EventId;
use serde::{Deserialize, Serialize};

/// A top-level tenant: one named event (typically one per year's gathering).
///
/// Owns its own ACLs, concentric-street dictionary, incidents, and field
/// reports, but carries no children inline here — those live in the store
/// keyed by this event's id. `Event` itself is created explicitly and is
/// never deleted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
}

impl Event {
    pub fn new(id: EventId) -> Self {
        Self { id }
    }
}

impl ims_core::Entity for Event {
    type Id = EventId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
