//! The `Store` contract: every operation the core's data store exposes,
//! abstracted over whatever engine backs it (see [`crate::postgres`] and
//! [`crate::memory`]).
//!
//! Every method is async (a suspension point backed by I/O) and returns
//! [`StorageError`] on failure. Each public mutation here is one
//! transaction: if any step fails, no partial write is observable, and no
//! locking is exposed to callers beyond that per-transaction guarantee.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use ims_core::{ConcentricStreetId, EventId, FieldReportNumber, IncidentNumber};
use ims_domain::{
    AclExpression, FieldReport, Incident, IncidentState, IncidentType, ImsExport, Location, Priority, ReportEntry,
};

use crate::error::StorageError;

#[async_trait]
pub trait Store: Send + Sync {
    // ---- Events ----------------------------------------------------------

    async fn events(&self) -> Result<Vec<EventId>, StorageError>;

    /// Idempotent: creating an event that already exists is a no-op.
    async fn create_event(&self, event: &EventId) -> Result<(), StorageError>;

    // ---- Incident types ----------------------------------------------------

    async fn incident_types(&self, include_hidden: bool) -> Result<Vec<IncidentType>, StorageError>;

    /// Idempotent: creating a type that already exists is a no-op (its
    /// `hidden` flag is left untouched).
    async fn create_incident_type(&self, name: &str, hidden: bool) -> Result<(), StorageError>;

    async fn show_incident_types(&self, names: &[String]) -> Result<(), StorageError>;

    async fn hide_incident_types(&self, names: &[String]) -> Result<(), StorageError>;

    // ---- Per-event ACLs ----------------------------------------------------

    async fn readers(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError>;
    async fn writers(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError>;
    async fn reporters(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError>;

    /// Replace semantics: the given set becomes the entire mode.
    async fn set_readers(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError>;
    async fn set_writers(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError>;
    async fn set_reporters(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError>;

    // ---- Concentric streets ------------------------------------------------

    async fn concentric_streets(&self, event: &EventId) -> Result<BTreeMap<ConcentricStreetId, String>, StorageError>;

    async fn create_concentric_street(
        &self,
        event: &EventId,
        id: &ConcentricStreetId,
        name: &str,
    ) -> Result<(), StorageError>;

    // ---- Incidents ----------------------------------------------------------

    async fn incidents(&self, event: &EventId) -> Result<Vec<Incident>, StorageError>;

    async fn incident_with_number(
        &self,
        event: &EventId,
        number: IncidentNumber,
    ) -> Result<Option<Incident>, StorageError>;

    /// Allocates the next incident number within `event` (the caller's
    /// `incident.number` is ignored) and returns the stored incident, number
    /// assigned, with any report entries already attached to `incident`
    /// persisted alongside it. No automatic entry is added for creation
    /// itself.
    async fn create_incident(&self, incident: Incident, author: &str) -> Result<Incident, StorageError>;

    /// Honors `incident.number`, for bulk import; raises
    /// [`StorageError::Conflict`] if that number is already in use within
    /// the event. Does not append an automatic entry. After a successful
    /// import the event's max-incident-number counter is raised to at least
    /// this number.
    async fn import_incident(&self, incident: Incident) -> Result<(), StorageError>;

    async fn set_incident_priority(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Priority,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_state(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: IncidentState,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_summary(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError>;

    /// Replaces the whole location in one step (used by import and by any
    /// caller that already has a complete `Location`); the five
    /// `set_incident_location_*` setters below are what the API's
    /// field-by-field edit path calls, one per touched nested key.
    async fn set_incident_location(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<Location>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_location_name(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_location_concentric(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<ConcentricStreetId>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_location_radial_hour(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<u8>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_location_radial_minute(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<u8>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn set_incident_location_description(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError>;

    /// Set-valued replace; the automatic entry lists the new set in full
    /// (spec: `Changed <field> to: <comma-separated values>`), not a diff.
    async fn set_incident_rangers(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: BTreeSet<String>,
        author: &str,
    ) -> Result<(), StorageError>;

    /// Hidden incident types are rejected here (server-side filter); the
    /// store validates against the *visible* catalog, not the full one.
    async fn set_incident_incident_types(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: BTreeSet<String>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn add_report_entries_to_incident(
        &self,
        event: &EventId,
        number: IncidentNumber,
        entries: Vec<ReportEntry>,
        author: &str,
    ) -> Result<(), StorageError>;

    // ---- Field reports ------------------------------------------------------

    async fn field_reports(&self, event: &EventId) -> Result<Vec<FieldReport>, StorageError>;

    async fn field_report_with_number(
        &self,
        event: &EventId,
        number: FieldReportNumber,
    ) -> Result<Option<FieldReport>, StorageError>;

    async fn create_field_report(&self, report: FieldReport, author: &str) -> Result<FieldReport, StorageError>;

    async fn import_field_report(&self, report: FieldReport) -> Result<(), StorageError>;

    async fn set_field_report_summary(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn add_report_entries_to_field_report(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        entries: Vec<ReportEntry>,
        author: &str,
    ) -> Result<(), StorageError>;

    /// Fails with [`StorageError::Conflict`] if `incident` doesn't belong to
    /// `event`, or with [`StorageError::NotFound`] if either number is
    /// unknown.
    async fn attach_field_report_to_incident(
        &self,
        event: &EventId,
        report_number: FieldReportNumber,
        incident_number: IncidentNumber,
        author: &str,
    ) -> Result<(), StorageError>;

    async fn detach_field_report_from_incident(
        &self,
        event: &EventId,
        report_number: FieldReportNumber,
        author: &str,
    ) -> Result<(), StorageError>;

    /// Returned as a `Vec` for forward compatibility (spec's many-to-many
    /// phrasing); today a field report attaches to at most one incident, so
    /// this holds zero or one entries.
    async fn incidents_attached_to_field_report(
        &self,
        event: &EventId,
        number: FieldReportNumber,
    ) -> Result<Vec<IncidentNumber>, StorageError>;

    // ---- Export / import ----------------------------------------------------

    async fn export(&self) -> Result<ImsExport, StorageError>;

    /// Restores state into an empty store; fails with
    /// [`StorageError::Conflict`] if the store already holds any event,
    /// incident type beyond the system defaults, or field report.
    async fn import(&self, export: ImsExport) -> Result<(), StorageError>;
}
