//! Field report: a field-originated narrative, optionally linked to an
//! incident.
//!
//! Modeled as strict many-to-one (a field report attaches to at most one
//! incident at a time), the rewrite's choice for Open Question (b): the
//! source's schema allows many-to-many but every code path treats it as
//! many-to-one.

use chrono::{DateTime, Utc};
use ims_core::{DomainError, EventId, FieldReportNumber, IncidentNumber};
use serde::{Deserialize, Serialize};

use crate::report_entry::ReportEntry;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldReportId {
    pub event: EventId,
    pub number: FieldReportNumber,
}

/// # Invariants
/// - If attached, the attached incident belongs to the same event.
/// - `created` is set once and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    pub event: EventId,
    pub number: FieldReportNumber,
    pub created: DateTime<Utc>,
    pub summary: Option<String>,
    pub incident: Option<IncidentNumber>,
    pub report_entries: Vec<ReportEntry>,
}

impl FieldReport {
    pub fn new(event: EventId, number: FieldReportNumber, created: DateTime<Utc>) -> Self {
        Self {
            event,
            number,
            created,
            summary: None,
            incident: None,
            report_entries: Vec::new(),
        }
    }

    pub fn field_report_id(&self) -> FieldReportId {
        FieldReportId {
            event: self.event.clone(),
            number: self.number,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for entry in &self.report_entries {
            entry.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> EventId {
        EventId::new("2024").unwrap()
    }

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 25, 9, 0, 0).unwrap()
    }

    #[test]
    fn new_field_report_starts_unattached() {
        let report = FieldReport::new(event(), FieldReportNumber::new(1).unwrap(), t());
        assert!(report.incident.is_none());
    }

    #[test]
    fn attach_and_detach() {
        let mut report = FieldReport::new(event(), FieldReportNumber::new(1).unwrap(), t());
        report.incident = Some(IncidentNumber::new(3).unwrap());
        assert_eq!(report.incident.map(|n| n.get()), Some(3));
        report.incident = None;
        assert!(report.incident.is_none());
    }
}
