//! Incident: the primary dispatch record, keyed by (event, number).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ims_core::{DomainError, EventId, IncidentNumber};
use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::priority::Priority;
use crate::report_entry::ReportEntry;
use crate::state::IncidentState;

/// Identity of an incident: its owning event plus its per-event number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId {
    pub event: EventId,
    pub number: IncidentNumber,
}

/// An ongoing or closed operational record owned by an event.
///
/// # Invariants
/// - `priority` is 1..5.
/// - `created` is always set and never modified after creation.
/// - `version` increases strictly on every mutation and matches the count of
///   report entries at the time of the last mutation (see
///   [`Incident::bump_version`]).
/// - Every `report_entries` element validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub event: EventId,
    pub number: IncidentNumber,
    pub version: u64,
    pub created: DateTime<Utc>,
    pub priority: Priority,
    pub state: IncidentState,
    pub summary: Option<String>,
    pub location: Option<Location>,
    pub ranger_handles: BTreeSet<String>,
    pub incident_types: BTreeSet<String>,
    pub report_entries: Vec<ReportEntry>,
}

impl Incident {
    /// Builds a freshly created incident: version 1, empty journal.
    pub fn new(event: EventId, number: IncidentNumber, created: DateTime<Utc>) -> Self {
        Self {
            event,
            number,
            version: 1,
            created,
            priority: Priority::default(),
            state: IncidentState::default(),
            summary: None,
            location: None,
            ranger_handles: BTreeSet::new(),
            incident_types: BTreeSet::new(),
            report_entries: Vec::new(),
        }
    }

    /// Appends journal entries and bumps the version counter by one,
    /// regardless of how many entries were appended in this call: the spec
    /// treats one mutating call (however many fields it touches) as one
    /// version bump, with one journal entry per changed field.
    pub fn bump_version(&mut self, entries: impl IntoIterator<Item = ReportEntry>) {
        self.report_entries.extend(entries);
        self.version += 1;
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(location) = &self.location {
            location.validate()?;
        }
        for entry in &self.report_entries {
            entry.validate()?;
        }
        Ok(())
    }

    /// Identity tuple (event, number). Entity identity here is by value, not
    /// by a stored id field, so this builds a fresh `IncidentId` on demand.
    pub fn incident_id(&self) -> IncidentId {
        IncidentId {
            event: self.event.clone(),
            number: self.number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> EventId {
        EventId::new("2024").unwrap()
    }

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 25, hour, 0, 0).unwrap()
    }

    #[test]
    fn new_incident_starts_at_version_one() {
        let incident = Incident::new(event(), IncidentNumber::new(1).unwrap(), t(0));
        assert_eq!(incident.version, 1);
        assert!(incident.report_entries.is_empty());
        assert_eq!(incident.state, IncidentState::New);
        assert_eq!(incident.priority, Priority::default());
    }

    #[test]
    fn bump_version_appends_and_increments() {
        let mut incident = Incident::new(event(), IncidentNumber::new(1).unwrap(), t(0));
        let before = incident.version;
        incident.bump_version([ReportEntry::changed("alice", t(1), "priority", 5)]);
        assert_eq!(incident.version, before + 1);
        assert_eq!(incident.report_entries.len(), 1);
        assert_eq!(incident.report_entries[0].text, "Changed priority to: 5");
    }

    #[test]
    fn validate_is_idempotent() {
        let incident = Incident::new(event(), IncidentNumber::new(1).unwrap(), t(0));
        assert!(incident.validate().is_ok());
        assert!(incident.validate().is_ok());
    }
}
