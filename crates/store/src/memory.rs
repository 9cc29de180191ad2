//! In-memory reference implementation: the same contract as
//! [`crate::postgres::PostgresStore`], backed by a single `RwLock`'d state
//! tree instead of a database. Used by the crate's own tests, by the API
//! crate's integration tests, and by any deployment that doesn't want a
//! Postgres dependency for a small event.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ims_core::{ConcentricStreetId, EventId, FieldReportNumber, IncidentNumber};
use ims_domain::{
    AclExpression, EventAccess, FieldReport, Incident, IncidentState, IncidentType, ImsExport, ExportedEvent,
    Location, Priority, ReportEntry, SYSTEM_INCIDENT_TYPES,
};
use ims_events::{StoreWrite, StoreWriteSink};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::Store;

#[derive(Default)]
struct EventState {
    access: EventAccess,
    streets: ims_domain::ConcentricStreetDictionary,
    incidents: BTreeMap<u32, Incident>,
    max_incident_number: u32,
    field_reports: BTreeMap<u32, FieldReport>,
    max_field_report_number: u32,
}

#[derive(Default)]
struct State {
    events: BTreeMap<String, EventState>,
    incident_types: BTreeMap<String, IncidentType>,
}

impl State {
    fn with_system_types() -> Self {
        let mut state = Self::default();
        for name in SYSTEM_INCIDENT_TYPES {
            state
                .incident_types
                .insert(name.to_string(), IncidentType::new(*name, false).unwrap());
        }
        state
    }
}

pub struct InMemoryStore {
    state: RwLock<State>,
    sink: Arc<dyn StoreWriteSink>,
}

impl InMemoryStore {
    pub fn new(sink: Arc<dyn StoreWriteSink>) -> Self {
        Self {
            state: RwLock::new(State::with_system_types()),
            sink,
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn events(&self) -> Result<Vec<EventId>, StorageError> {
        let state = self.state.read().await;
        state.events.keys().map(|k| Ok(EventId::new(k.clone())?)).collect()
    }

    async fn create_event(&self, event: &EventId) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state.events.entry(event.as_str().to_string()).or_default();
        Ok(())
    }

    async fn incident_types(&self, include_hidden: bool) -> Result<Vec<IncidentType>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .incident_types
            .values()
            .filter(|t| include_hidden || !t.hidden)
            .cloned()
            .collect())
    }

    async fn create_incident_type(&self, name: &str, hidden: bool) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .incident_types
            .entry(name.to_string())
            .or_insert(IncidentType::new(name, hidden)?);
        Ok(())
    }

    async fn show_incident_types(&self, names: &[String]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        for name in names {
            if let Some(t) = state.incident_types.get_mut(name) {
                t.hidden = false;
            }
        }
        Ok(())
    }

    async fn hide_incident_types(&self, names: &[String]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        for name in names {
            if let Some(t) = state.incident_types.get_mut(name) {
                t.hidden = true;
            }
        }
        Ok(())
    }

    async fn readers(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError> {
        Ok(self.event_state(event).await?.access.readers.clone())
    }

    async fn writers(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError> {
        Ok(self.event_state(event).await?.access.writers.clone())
    }

    async fn reporters(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError> {
        Ok(self.event_state(event).await?.access.reporters.clone())
    }

    async fn set_readers(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        event_state.access.readers = expressions;
        Ok(())
    }

    async fn set_writers(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        event_state.access.writers = expressions;
        Ok(())
    }

    async fn set_reporters(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        event_state.access.reporters = expressions;
        Ok(())
    }

    async fn concentric_streets(
        &self,
        event: &EventId,
    ) -> Result<BTreeMap<ConcentricStreetId, String>, StorageError> {
        Ok(self.event_state(event).await?.streets.as_map().clone())
    }

    async fn create_concentric_street(
        &self,
        event: &EventId,
        id: &ConcentricStreetId,
        name: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        event_state.streets.add(id.clone(), name.to_string())?;
        Ok(())
    }

    async fn incidents(&self, event: &EventId) -> Result<Vec<Incident>, StorageError> {
        Ok(self.event_state(event).await?.incidents.values().cloned().collect())
    }

    async fn incident_with_number(
        &self,
        event: &EventId,
        number: IncidentNumber,
    ) -> Result<Option<Incident>, StorageError> {
        Ok(self.event_state(event).await?.incidents.get(&number.get()).cloned())
    }

    async fn create_incident(&self, mut incident: Incident, _author: &str) -> Result<Incident, StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .entry(incident.event.as_str().to_string())
            .or_default();
        let next = event_state.max_incident_number + 1;
        let number = IncidentNumber::new(next)?;
        incident.number = number;
        event_state.max_incident_number = next;
        event_state.incidents.insert(next, incident.clone());
        drop(state);
        self.sink
            .notify(StoreWrite::Incident {
                event: incident.event.clone(),
                number,
            })
            .await;
        Ok(incident)
    }

    async fn import_incident(&self, incident: Incident) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .entry(incident.event.as_str().to_string())
            .or_default();
        let number = incident.number.get();
        if event_state.incidents.contains_key(&number) {
            return Err(StorageError::Conflict(format!(
                "incident number {number} already in use"
            )));
        }
        event_state.max_incident_number = event_state.max_incident_number.max(number);
        event_state.incidents.insert(number, incident);
        Ok(())
    }

    async fn set_incident_priority(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Priority,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            incident.priority = value;
            vec![ReportEntry::changed(author, now, "priority", value.get())]
        })
        .await
    }

    async fn set_incident_state(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: IncidentState,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            incident.state = value;
            vec![ReportEntry::changed(author, now, "state", value.external_name())]
        })
        .await
    }

    async fn set_incident_summary(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            incident.summary = value.clone();
            vec![ReportEntry::changed(
                author,
                now,
                "summary",
                value.clone().unwrap_or_default(),
            )]
        })
        .await
    }

    async fn set_incident_location(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<Location>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            incident.location = value.clone();
            vec![ReportEntry::changed(author, now, "location", describe_location(&value))]
        })
        .await
    }

    async fn set_incident_location_name(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            let location = incident.location.get_or_insert_with(Location::default);
            location.name = value.clone();
            vec![ReportEntry::changed(
                author,
                now,
                "location name",
                value.clone().unwrap_or_default(),
            )]
        })
        .await
    }

    async fn set_incident_location_concentric(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<ConcentricStreetId>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            let location = incident.location.get_or_insert_with(Location::default);
            let description = take_address_description(location);
            location.address = Some(ims_domain::LocationAddress::Concentric {
                concentric: value.clone().map(|c| c.as_str().to_string()),
                radial_hour: radial_hour(location),
                radial_minute: radial_minute(location),
                description,
            });
            vec![ReportEntry::changed(
                author,
                now,
                "location concentric street",
                value.map(|c| c.as_str().to_string()).unwrap_or_default(),
            )]
        })
        .await
    }

    async fn set_incident_location_radial_hour(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<u8>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            let location = incident.location.get_or_insert_with(Location::default);
            set_radial_hour(location, value);
            vec![ReportEntry::changed(
                author,
                now,
                "location radial hour",
                value.map(|v| v.to_string()).unwrap_or_default(),
            )]
        })
        .await
    }

    async fn set_incident_location_radial_minute(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<u8>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            let location = incident.location.get_or_insert_with(Location::default);
            set_radial_minute(location, value);
            vec![ReportEntry::changed(
                author,
                now,
                "location radial minute",
                value.map(|v| v.to_string()).unwrap_or_default(),
            )]
        })
        .await
    }

    async fn set_incident_location_description(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            let location = incident.location.get_or_insert_with(Location::default);
            set_description(location, value.clone());
            vec![ReportEntry::changed(
                author,
                now,
                "location description",
                value.clone().unwrap_or_default(),
            )]
        })
        .await
    }

    async fn set_incident_rangers(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: BTreeSet<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, |incident, now, author| {
            incident.ranger_handles = value.clone();
            vec![ReportEntry::changed_set(author, now, "Rangers", value.clone())]
        })
        .await
    }

    async fn set_incident_incident_types(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: BTreeSet<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let catalog = {
            let state = self.state.read().await;
            state.incident_types.clone()
        };
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        let incident = event_state
            .incidents
            .get_mut(&number.get())
            .ok_or(StorageError::NotFound)?;
        for name in &value {
            match catalog.get(name) {
                None => return Err(StorageError::Validation(format!("unknown incident type: {name}"))),
                Some(t) if t.hidden && !incident.incident_types.contains(name) => {
                    return Err(StorageError::Validation(format!(
                        "incident type is hidden and cannot be freshly assigned: {name}"
                    )));
                }
                _ => {}
            }
        }
        incident.incident_types = value.clone();
        let now = Utc::now();
        incident.bump_version([ReportEntry::changed_set(author, now, "Incident Types", value.clone())]);
        let event_id = incident.event.clone();
        drop(state);
        self.sink
            .notify(StoreWrite::Incident { event: event_id, number })
            .await;
        Ok(())
    }

    async fn add_report_entries_to_incident(
        &self,
        event: &EventId,
        number: IncidentNumber,
        entries: Vec<ReportEntry>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_incident(event, number, author, move |_incident, _now, _author| entries.clone())
            .await
    }

    async fn field_reports(&self, event: &EventId) -> Result<Vec<FieldReport>, StorageError> {
        Ok(self.event_state(event).await?.field_reports.values().cloned().collect())
    }

    async fn field_report_with_number(
        &self,
        event: &EventId,
        number: FieldReportNumber,
    ) -> Result<Option<FieldReport>, StorageError> {
        Ok(self
            .event_state(event)
            .await?
            .field_reports
            .get(&number.get())
            .cloned())
    }

    async fn create_field_report(&self, mut report: FieldReport, _author: &str) -> Result<FieldReport, StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .entry(report.event.as_str().to_string())
            .or_default();
        let next = event_state.max_field_report_number + 1;
        let number = FieldReportNumber::new(next)?;
        report.number = number;
        event_state.max_field_report_number = next;
        event_state.field_reports.insert(next, report.clone());
        drop(state);
        self.sink
            .notify(StoreWrite::FieldReport {
                event: report.event.clone(),
                number,
            })
            .await;
        Ok(report)
    }

    async fn import_field_report(&self, report: FieldReport) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .entry(report.event.as_str().to_string())
            .or_default();
        let number = report.number.get();
        if event_state.field_reports.contains_key(&number) {
            return Err(StorageError::Conflict(format!(
                "field report number {number} already in use"
            )));
        }
        event_state.max_field_report_number = event_state.max_field_report_number.max(number);
        event_state.field_reports.insert(number, report);
        Ok(())
    }

    async fn set_field_report_summary(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_field_report(event, number, author, |report, now, author| {
            report.summary = value.clone();
            vec![ReportEntry::changed(
                author,
                now,
                "summary",
                value.clone().unwrap_or_default(),
            )]
        })
        .await
    }

    async fn add_report_entries_to_field_report(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        entries: Vec<ReportEntry>,
        author: &str,
    ) -> Result<(), StorageError> {
        self.mutate_field_report(event, number, author, move |_r, _now, _author| entries.clone())
            .await
    }

    async fn attach_field_report_to_incident(
        &self,
        event: &EventId,
        report_number: FieldReportNumber,
        incident_number: IncidentNumber,
        author: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        if !event_state.incidents.contains_key(&incident_number.get()) {
            return Err(StorageError::NotFound);
        }
        let report = event_state
            .field_reports
            .get_mut(&report_number.get())
            .ok_or(StorageError::NotFound)?;
        report.incident = Some(incident_number);
        let now = Utc::now();
        report.report_entries.push(ReportEntry::changed(
            author,
            now,
            "attached incident",
            incident_number.get(),
        ));
        drop(state);
        self.sink
            .notify(StoreWrite::FieldReport {
                event: event.clone(),
                number: report_number,
            })
            .await;
        self.sink
            .notify(StoreWrite::Incident {
                event: event.clone(),
                number: incident_number,
            })
            .await;
        Ok(())
    }

    async fn detach_field_report_from_incident(
        &self,
        event: &EventId,
        report_number: FieldReportNumber,
        author: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        let report = event_state
            .field_reports
            .get_mut(&report_number.get())
            .ok_or(StorageError::NotFound)?;
        let previous = report.incident.take();
        let now = Utc::now();
        report
            .report_entries
            .push(ReportEntry::changed(author, now, "attached incident", "none"));
        drop(state);
        self.sink
            .notify(StoreWrite::FieldReport {
                event: event.clone(),
                number: report_number,
            })
            .await;
        if let Some(incident_number) = previous {
            self.sink
                .notify(StoreWrite::Incident {
                    event: event.clone(),
                    number: incident_number,
                })
                .await;
        }
        Ok(())
    }

    async fn incidents_attached_to_field_report(
        &self,
        event: &EventId,
        number: FieldReportNumber,
    ) -> Result<Vec<IncidentNumber>, StorageError> {
        let state = self.state.read().await;
        let event_state = state.events.get(event.as_str()).ok_or(StorageError::NotFound)?;
        let report = event_state
            .field_reports
            .get(&number.get())
            .ok_or(StorageError::NotFound)?;
        Ok(report.incident.into_iter().collect())
    }

    async fn export(&self) -> Result<ImsExport, StorageError> {
        let state = self.state.read().await;
        let mut export = ImsExport::new();
        export.incident_types = state.incident_types.values().cloned().collect();
        export.incident_types.sort_by(|a, b| a.name.cmp(&b.name));
        for (name, event_state) in &state.events {
            export.events.push(ExportedEvent {
                event: EventId::new(name.clone())?,
                access: event_state.access.clone(),
                concentric_streets: event_state.streets.as_map().clone(),
                incidents: event_state.incidents.values().cloned().collect(),
                incident_reports: event_state.field_reports.values().cloned().collect(),
            });
        }
        export.events.sort_by(|a, b| a.event.as_str().cmp(b.event.as_str()));
        Ok(export)
    }

    async fn import(&self, export: ImsExport) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let is_empty = state.events.is_empty()
            && state
                .incident_types
                .keys()
                .all(|name| SYSTEM_INCIDENT_TYPES.contains(&name.as_str()));
        if !is_empty {
            return Err(StorageError::Conflict("import requires an empty store".to_string()));
        }
        for t in export.incident_types {
            state.incident_types.insert(t.name.clone(), t);
        }
        for exported in export.events {
            let mut event_state = EventState {
                access: exported.access,
                streets: ims_domain::ConcentricStreetDictionary::new(),
                ..EventState::default()
            };
            for (id, name) in exported.concentric_streets {
                event_state.streets.add(id, name)?;
            }
            for incident in exported.incidents {
                event_state.max_incident_number = event_state.max_incident_number.max(incident.number.get());
                event_state.incidents.insert(incident.number.get(), incident);
            }
            for report in exported.incident_reports {
                event_state.max_field_report_number =
                    event_state.max_field_report_number.max(report.number.get());
                event_state.field_reports.insert(report.number.get(), report);
            }
            state.events.insert(exported.event.as_str().to_string(), event_state);
        }
        Ok(())
    }
}

impl InMemoryStore {
    async fn event_state_guard(&self) -> tokio::sync::RwLockReadGuard<'_, State> {
        self.state.read().await
    }

    async fn event_state(&self, event: &EventId) -> Result<EventStateSnapshot, StorageError> {
        let guard = self.event_state_guard().await;
        let event_state = guard.events.get(event.as_str()).ok_or(StorageError::NotFound)?;
        Ok(EventStateSnapshot {
            access: event_state.access.clone(),
            streets: event_state.streets.clone(),
        })
    }

    /// Applies `f` to the incident at (event, number), appending whatever
    /// report entries it returns and bumping the version exactly once,
    /// regardless of how many entries that was — one mutating call is one
    /// transaction and one version bump.
    async fn mutate_incident(
        &self,
        event: &EventId,
        number: IncidentNumber,
        author: &str,
        f: impl FnOnce(&mut Incident, chrono::DateTime<Utc>, &str) -> Vec<ReportEntry> + Send,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        let incident = event_state
            .incidents
            .get_mut(&number.get())
            .ok_or(StorageError::NotFound)?;
        let now = Utc::now();
        let entries = f(incident, now, author);
        incident.bump_version(entries);
        incident.validate()?;
        drop(state);
        self.sink
            .notify(StoreWrite::Incident {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn mutate_field_report(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        author: &str,
        f: impl FnOnce(&mut FieldReport, chrono::DateTime<Utc>, &str) -> Vec<ReportEntry> + Send,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let event_state = state
            .events
            .get_mut(event.as_str())
            .ok_or(StorageError::NotFound)?;
        let report = event_state
            .field_reports
            .get_mut(&number.get())
            .ok_or(StorageError::NotFound)?;
        let now = Utc::now();
        let entries = f(report, now, author);
        report.report_entries.extend(entries);
        report.validate()?;
        drop(state);
        self.sink
            .notify(StoreWrite::FieldReport {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }
}

struct EventStateSnapshot {
    access: EventAccess,
    streets: ims_domain::ConcentricStreetDictionary,
}

fn describe_location(location: &Option<Location>) -> String {
    location
        .as_ref()
        .and_then(|l| l.name.clone())
        .unwrap_or_default()
}

fn take_address_description(location: &mut Location) -> Option<String> {
    match &location.address {
        Some(ims_domain::LocationAddress::Text { description }) => description.clone(),
        Some(ims_domain::LocationAddress::Concentric { description, .. }) => description.clone(),
        None => None,
    }
}

fn radial_hour(location: &Location) -> Option<u8> {
    match &location.address {
        Some(ims_domain::LocationAddress::Concentric { radial_hour, .. }) => *radial_hour,
        _ => None,
    }
}

fn radial_minute(location: &Location) -> Option<u8> {
    match &location.address {
        Some(ims_domain::LocationAddress::Concentric { radial_minute, .. }) => *radial_minute,
        _ => None,
    }
}

fn set_radial_hour(location: &mut Location, value: Option<u8>) {
    let concentric = match &location.address {
        Some(ims_domain::LocationAddress::Concentric { concentric, .. }) => concentric.clone(),
        _ => None,
    };
    let minute = radial_minute(location);
    let description = take_address_description(location);
    location.address = Some(ims_domain::LocationAddress::Concentric {
        concentric,
        radial_hour: value,
        radial_minute: minute,
        description,
    });
}

fn set_radial_minute(location: &mut Location, value: Option<u8>) {
    let concentric = match &location.address {
        Some(ims_domain::LocationAddress::Concentric { concentric, .. }) => concentric.clone(),
        _ => None,
    };
    let hour = radial_hour(location);
    let description = take_address_description(location);
    location.address = Some(ims_domain::LocationAddress::Concentric {
        concentric,
        radial_hour: hour,
        radial_minute: value,
        description,
    });
}

fn set_description(location: &mut Location, value: Option<String>) {
    match &mut location.address {
        Some(ims_domain::LocationAddress::Text { description }) => *description = value,
        Some(ims_domain::LocationAddress::Concentric { description, .. }) => *description = value,
        None => {
            location.address = Some(ims_domain::LocationAddress::Text { description: value });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ims_core::DomainError;
    use std::sync::Arc;

    fn event() -> EventId {
        EventId::new("2024").unwrap()
    }

    fn new_store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(ims_events::NotificationBus::new()))
    }

    #[tokio::test]
    async fn successive_creates_allocate_increasing_numbers() {
        let store = new_store();
        store.create_event(&event()).await.unwrap();
        let now = Utc::now();
        let first = store
            .create_incident(Incident::new(event(), IncidentNumber::new(1).unwrap(), now), "alice")
            .await
            .unwrap();
        let second = store
            .create_incident(Incident::new(event(), IncidentNumber::new(1).unwrap(), now), "alice")
            .await
            .unwrap();
        assert_eq!(first.number.get(), 1);
        assert_eq!(second.number.get(), 2);
    }

    #[tokio::test]
    async fn setter_bumps_version_and_appends_entry() {
        let store = new_store();
        store.create_event(&event()).await.unwrap();
        let incident = store
            .create_incident(
                Incident::new(event(), IncidentNumber::new(1).unwrap(), Utc::now()),
                "alice",
            )
            .await
            .unwrap();
        let before = incident.version;
        store
            .set_incident_priority(&event(), incident.number, Priority::new(5).unwrap(), "alice")
            .await
            .unwrap();
        let updated = store
            .incident_with_number(&event(), incident.number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, before + 1);
        assert_eq!(updated.report_entries.last().unwrap().text, "Changed priority to: 5");
    }

    #[tokio::test]
    async fn import_rejects_colliding_number() {
        let store = new_store();
        let now = Utc::now();
        store
            .import_incident(Incident::new(event(), IncidentNumber::new(5).unwrap(), now))
            .await
            .unwrap();
        let err = store
            .import_incident(Incident::new(event(), IncidentNumber::new(5).unwrap(), now))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::Conflict("incident number 5 already in use".to_string()));
    }

    #[tokio::test]
    async fn export_then_import_round_trips() {
        let store = new_store();
        store.create_event(&event()).await.unwrap();
        store
            .create_incident(
                Incident::new(event(), IncidentNumber::new(1).unwrap(), Utc::now()),
                "alice",
            )
            .await
            .unwrap();
        let export = store.export().await.unwrap();

        let fresh = new_store();
        fresh.import(export.clone()).await.unwrap();
        let reexported = fresh.export().await.unwrap();
        assert_eq!(export, reexported);
    }

    #[tokio::test]
    async fn attaching_to_unknown_incident_is_not_found() {
        let store = new_store();
        store.create_event(&event()).await.unwrap();
        let report = store
            .create_field_report(
                FieldReport::new(event(), FieldReportNumber::new(1).unwrap(), Utc::now()),
                "alice",
            )
            .await
            .unwrap();
        let err = store
            .attach_field_report_to_incident(&event(), report.number, IncidentNumber::new(99).unwrap(), "alice")
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::NotFound);
    }

    #[tokio::test]
    async fn hidden_incident_type_rejected_when_freshly_assigned() {
        let store = new_store();
        store.create_event(&event()).await.unwrap();
        store.create_incident_type("Medical", true).await.unwrap();
        let incident = store
            .create_incident(
                Incident::new(event(), IncidentNumber::new(1).unwrap(), Utc::now()),
                "alice",
            )
            .await
            .unwrap();
        let mut types = BTreeSet::new();
        types.insert("Medical".to_string());
        let err = store
            .set_incident_incident_types(&event(), incident.number, types, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn domain_error_maps_to_storage_error() {
        let err: StorageError = DomainError::NotFound.into();
        assert_eq!(err, StorageError::NotFound);
    }
}
