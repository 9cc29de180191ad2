//! Postgres-backed store: the reference persistence layer named in spec
//! §4.B. One writer transaction per mutating call; readers run outside a
//! transaction and rely on Postgres's MVCC for their own consistent
//! snapshot.

mod rows;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ims_core::{ConcentricStreetId, EventId, FieldReportNumber, IncidentNumber};
use ims_domain::{
    AclExpression, AclMode, EventAccess, ExportedEvent, FieldReport, Incident, IncidentState, IncidentType,
    ImsExport, Location, Priority, ReportEntry, SYSTEM_INCIDENT_TYPES,
};
use ims_events::{StoreWrite, StoreWriteSink};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use crate::error::StorageError;
use crate::traits::Store;
use rows::{incident_from_rows, location_columns, IncidentRow};

/// Postgres-backed implementation of [`Store`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
    sink: Arc<dyn StoreWriteSink>,
}

impl PostgresStore {
    /// Connects, runs any pending migrations, and returns a ready store.
    pub async fn connect(database_url: &str, sink: Arc<dyn StoreWriteSink>) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
            sink,
        })
    }

    pub fn from_pool(pool: PgPool, sink: Arc<dyn StoreWriteSink>) -> Self {
        Self {
            pool: Arc::new(pool),
            sink,
        }
    }

    async fn acl_mode(&self, event: &EventId, mode: &str) -> Result<BTreeSet<AclExpression>, StorageError> {
        let rows = sqlx::query("SELECT expression FROM event_access WHERE event = $1 AND mode = $2")
            .bind(event.as_str())
            .bind(mode)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                let expr: String = row.try_get("expression").map_err(|e| StorageError::Io(e.to_string()))?;
                Ok(AclExpression::new(expr)?)
            })
            .collect()
    }

    async fn set_acl_mode(
        &self,
        event: &EventId,
        mode: &str,
        expressions: BTreeSet<AclExpression>,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query("DELETE FROM event_access WHERE event = $1 AND mode = $2")
            .bind(event.as_str())
            .bind(mode)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        for expr in expressions {
            sqlx::query("INSERT INTO event_access (event, expression, mode) VALUES ($1, $2, $3)")
                .bind(event.as_str())
                .bind(expr.as_str())
                .bind(mode)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    /// Inserts one automatic report entry and links it to the incident,
    /// within the caller's transaction. Does not bump the incident's
    /// version; callers append all of a mutation's entries first, then bump
    /// version once via [`Self::bump_incident_version`].
    async fn insert_incident_entry(
        tx: &mut Transaction<'_, Postgres>,
        event: &EventId,
        number: IncidentNumber,
        entry: &ReportEntry,
    ) -> Result<(), StorageError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO report_entry (author, text, created, generated) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&entry.author)
        .bind(&entry.text)
        .bind(entry.created)
        .bind(entry.automatic)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query("INSERT INTO incident__report_entry (event, incident_number, report_entry_id) VALUES ($1, $2, $3)")
            .bind(event.as_str())
            .bind(number.get() as i32)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn insert_field_report_entry(
        tx: &mut Transaction<'_, Postgres>,
        event: &EventId,
        number: FieldReportNumber,
        entry: &ReportEntry,
    ) -> Result<(), StorageError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO report_entry (author, text, created, generated) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&entry.author)
        .bind(&entry.text)
        .bind(entry.created)
        .bind(entry.automatic)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query(
            "INSERT INTO incident_report__report_entry (event, number, report_entry_id) VALUES ($1, $2, $3)",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn bump_incident_version(
        tx: &mut Transaction<'_, Postgres>,
        event: &EventId,
        number: IncidentNumber,
    ) -> Result<(), StorageError> {
        let updated = sqlx::query("UPDATE incident SET version = version + 1 WHERE event = $1 AND number = $2")
            .bind(event.as_str())
            .bind(number.get() as i32)
            .execute(&mut **tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// Applies a single-statement scalar update, records one automatic
    /// journal entry, and bumps the version — all in one transaction. This
    /// is the workhorse every scalar `set_incident_*` setter calls through.
    async fn apply_incident_scalar_update(
        &self,
        event: &EventId,
        number: IncidentNumber,
        update_sql: &str,
        bind: impl FnOnce(sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
        entry: ReportEntry,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        let query = bind(sqlx::query(update_sql));
        let updated = query
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Self::insert_incident_entry(&mut tx, event, number, &entry).await?;
        Self::bump_incident_version(&mut tx, event, number).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::Incident {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn load_incident_report_entries(
        &self,
        event: &EventId,
        number: IncidentNumber,
    ) -> Result<Vec<ReportEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT re.author, re.text, re.created, re.generated
             FROM incident__report_entry ire
             JOIN report_entry re ON re.id = ire.report_entry_id
             WHERE ire.event = $1 AND ire.incident_number = $2
             ORDER BY re.created ASC, re.id ASC",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter().map(rows::report_entry_from_row).collect()
    }

    async fn load_field_report_entries(
        &self,
        event: &EventId,
        number: FieldReportNumber,
    ) -> Result<Vec<ReportEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT re.author, re.text, re.created, re.generated
             FROM incident_report__report_entry irre
             JOIN report_entry re ON re.id = irre.report_entry_id
             WHERE irre.event = $1 AND irre.number = $2
             ORDER BY re.created ASC, re.id ASC",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter().map(rows::report_entry_from_row).collect()
    }

    async fn load_rangers(&self, event: &EventId, number: IncidentNumber) -> Result<BTreeSet<String>, StorageError> {
        let rows = sqlx::query("SELECT handle FROM incident__ranger WHERE event = $1 AND incident_number = $2")
            .bind(event.as_str())
            .bind(number.get() as i32)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("handle").map_err(|e| StorageError::Io(e.to_string())))
            .collect()
    }

    async fn load_incident_types_for(
        &self,
        event: &EventId,
        number: IncidentNumber,
    ) -> Result<BTreeSet<String>, StorageError> {
        let rows = sqlx::query(
            "SELECT incident_type_id FROM incident__incident_type WHERE event = $1 AND incident_number = $2",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                row.try_get::<String, _>("incident_type_id")
                    .map_err(|e| StorageError::Io(e.to_string()))
            })
            .collect()
    }

    async fn hydrate_incident(&self, row: IncidentRow) -> Result<Incident, StorageError> {
        let event = EventId::new(row.event.clone())?;
        let number = IncidentNumber::new(row.number as u32)?;
        let rangers = self.load_rangers(&event, number).await?;
        let incident_types = self.load_incident_types_for(&event, number).await?;
        let entries = self.load_incident_report_entries(&event, number).await?;
        let incident = incident_from_rows(row, rangers, incident_types, entries)?;
        incident.validate()?;
        Ok(incident)
    }

    async fn hydrate_field_report(&self, row: rows::FieldReportRow) -> Result<FieldReport, StorageError> {
        let event = EventId::new(row.event.clone())?;
        let number = FieldReportNumber::new(row.number as u32)?;
        let entries = self.load_field_report_entries(&event, number).await?;
        let report = rows::field_report_from_row(row, entries)?;
        report.validate()?;
        Ok(report)
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self))]
    async fn events(&self) -> Result<Vec<EventId>, StorageError> {
        let rows = sqlx::query("SELECT name FROM event ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                let name: String = row.try_get("name").map_err(|e| StorageError::Io(e.to_string()))?;
                Ok(EventId::new(name)?)
            })
            .collect()
    }

    async fn create_event(&self, event: &EventId) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO event (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(event.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn incident_types(&self, include_hidden: bool) -> Result<Vec<IncidentType>, StorageError> {
        let rows = if include_hidden {
            sqlx::query("SELECT name, hidden FROM incident_type ORDER BY name")
                .fetch_all(&*self.pool)
                .await
        } else {
            sqlx::query("SELECT name, hidden FROM incident_type WHERE hidden = FALSE ORDER BY name")
                .fetch_all(&*self.pool)
                .await
        }
        .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                let name: String = row.try_get("name").map_err(|e| StorageError::Io(e.to_string()))?;
                let hidden: bool = row.try_get("hidden").map_err(|e| StorageError::Io(e.to_string()))?;
                Ok(IncidentType::new(name, hidden)?)
            })
            .collect()
    }

    async fn create_incident_type(&self, name: &str, hidden: bool) -> Result<(), StorageError> {
        IncidentType::new(name, hidden)?;
        sqlx::query("INSERT INTO incident_type (name, hidden) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .bind(hidden)
            .execute(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn show_incident_types(&self, names: &[String]) -> Result<(), StorageError> {
        sqlx::query("UPDATE incident_type SET hidden = FALSE WHERE name = ANY($1)")
            .bind(names)
            .execute(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn hide_incident_types(&self, names: &[String]) -> Result<(), StorageError> {
        sqlx::query("UPDATE incident_type SET hidden = TRUE WHERE name = ANY($1)")
            .bind(names)
            .execute(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn readers(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError> {
        self.acl_mode(event, "read").await
    }
    async fn writers(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError> {
        self.acl_mode(event, "write").await
    }
    async fn reporters(&self, event: &EventId) -> Result<BTreeSet<AclExpression>, StorageError> {
        self.acl_mode(event, "report").await
    }

    async fn set_readers(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError> {
        self.set_acl_mode(event, "read", expressions).await
    }
    async fn set_writers(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError> {
        self.set_acl_mode(event, "write", expressions).await
    }
    async fn set_reporters(&self, event: &EventId, expressions: BTreeSet<AclExpression>) -> Result<(), StorageError> {
        self.set_acl_mode(event, "report", expressions).await
    }

    async fn concentric_streets(&self, event: &EventId) -> Result<BTreeMap<ConcentricStreetId, String>, StorageError> {
        let rows = sqlx::query("SELECT id, name FROM concentric_street WHERE event = $1 ORDER BY id")
            .bind(event.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let mut map = BTreeMap::new();
        for row in rows {
            let id: String = row.try_get("id").map_err(|e| StorageError::Io(e.to_string()))?;
            let name: String = row.try_get("name").map_err(|e| StorageError::Io(e.to_string()))?;
            map.insert(ConcentricStreetId::new(id)?, name);
        }
        Ok(map)
    }

    async fn create_concentric_street(
        &self,
        event: &EventId,
        id: &ConcentricStreetId,
        name: &str,
    ) -> Result<(), StorageError> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT name FROM concentric_street WHERE event = $1 AND id = $2")
                .bind(event.as_str())
                .bind(id.as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        if existing.is_some() {
            return Err(StorageError::Conflict(format!(
                "concentric street id already in use: {id}"
            )));
        }
        sqlx::query("INSERT INTO concentric_street (event, id, name) VALUES ($1, $2, $3)")
            .bind(event.as_str())
            .bind(id.as_str())
            .bind(name)
            .execute(&*self.pool)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn incidents(&self, event: &EventId) -> Result<Vec<Incident>, StorageError> {
        let rows: Vec<IncidentRow> = sqlx::query_as(
            "SELECT event, number, version, created, priority, state, summary,
                    location_name, location_type, location_concentric,
                    location_radial_hour, location_radial_minute, location_description
             FROM incident WHERE event = $1 ORDER BY number",
        )
        .bind(event.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate_incident(row).await?);
        }
        Ok(out)
    }

    async fn incident_with_number(
        &self,
        event: &EventId,
        number: IncidentNumber,
    ) -> Result<Option<Incident>, StorageError> {
        let row: Option<IncidentRow> = sqlx::query_as(
            "SELECT event, number, version, created, priority, state, summary,
                    location_name, location_type, location_concentric,
                    location_radial_hour, location_radial_minute, location_description
             FROM incident WHERE event = $1 AND number = $2",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        match row {
            Some(row) => Ok(Some(self.hydrate_incident(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_incident(&self, mut incident: Incident, _author: &str) -> Result<Incident, StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query("INSERT INTO event (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(incident.event.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let next: i32 = sqlx::query_scalar(
            "UPDATE event SET max_incident_number = max_incident_number + 1
             WHERE name = $1 RETURNING max_incident_number",
        )
        .bind(incident.event.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        let number = IncidentNumber::new(next as u32)?;
        incident.number = number;

        Self::insert_incident_row(&mut tx, &incident).await?;
        for entry in &incident.report_entries {
            Self::insert_incident_entry(&mut tx, &incident.event, number, entry).await?;
        }
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::Incident {
                event: incident.event.clone(),
                number,
            })
            .await;
        Ok(incident)
    }

    async fn import_incident(&self, incident: Incident) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query("INSERT INTO event (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(incident.event.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT number FROM incident WHERE event = $1 AND number = $2")
                .bind(incident.event.as_str())
                .bind(incident.number.get() as i32)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        if existing.is_some() {
            return Err(StorageError::Conflict(format!(
                "incident number {} already in use",
                incident.number
            )));
        }
        Self::insert_incident_row(&mut tx, &incident).await?;
        for entry in &incident.report_entries {
            Self::insert_incident_entry(&mut tx, &incident.event, incident.number, entry).await?;
        }
        sqlx::query("UPDATE event SET max_incident_number = GREATEST(max_incident_number, $2) WHERE name = $1")
            .bind(incident.event.as_str())
            .bind(incident.number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn set_incident_priority(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Priority,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET priority = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value.get() as i16).bind(event.as_str()).bind(number.get() as i32),
            ReportEntry::changed(author, now, "priority", value.get()),
        )
        .await
    }

    async fn set_incident_state(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: IncidentState,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET state = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value.external_name()).bind(event.as_str()).bind(number.get() as i32),
            ReportEntry::changed(author, now, "state", value.external_name()),
        )
        .await
    }

    async fn set_incident_summary(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let entry = ReportEntry::changed(author, now, "summary", value.clone().unwrap_or_default());
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET summary = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value).bind(event.as_str()).bind(number.get() as i32),
            entry,
        )
        .await
    }

    async fn set_incident_location(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<Location>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let (kind, concentric, hour, minute, description) = location_columns(&value);
        let name = value.as_ref().and_then(|l| l.name.clone());
        let entry = ReportEntry::changed(author, now, "location", name.clone().unwrap_or_default());
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET location_name = $1, location_type = $2, location_concentric = $3,
                                  location_radial_hour = $4, location_radial_minute = $5, location_description = $6
             WHERE event = $7 AND number = $8",
            |q| {
                q.bind(name)
                    .bind(kind)
                    .bind(concentric)
                    .bind(hour)
                    .bind(minute)
                    .bind(description)
                    .bind(event.as_str())
                    .bind(number.get() as i32)
            },
            entry,
        )
        .await
    }

    async fn set_incident_location_name(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let entry = ReportEntry::changed(author, now, "location name", value.clone().unwrap_or_default());
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET location_name = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value).bind(event.as_str()).bind(number.get() as i32),
            entry,
        )
        .await
    }

    async fn set_incident_location_concentric(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<ConcentricStreetId>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let id_str = value.as_ref().map(|v| v.as_str().to_string());
        let entry = ReportEntry::changed(author, now, "location concentric street", id_str.clone().unwrap_or_default());
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET location_type = 'garett', location_concentric = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(id_str).bind(event.as_str()).bind(number.get() as i32),
            entry,
        )
        .await
    }

    async fn set_incident_location_radial_hour(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<u8>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let entry = ReportEntry::changed(
            author,
            now,
            "location radial hour",
            value.map(|v| v.to_string()).unwrap_or_default(),
        );
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET location_type = 'garett', location_radial_hour = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value.map(|v| v as i16)).bind(event.as_str()).bind(number.get() as i32),
            entry,
        )
        .await
    }

    async fn set_incident_location_radial_minute(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<u8>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let entry = ReportEntry::changed(
            author,
            now,
            "location radial minute",
            value.map(|v| v.to_string()).unwrap_or_default(),
        );
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET location_type = 'garett', location_radial_minute = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value.map(|v| v as i16)).bind(event.as_str()).bind(number.get() as i32),
            entry,
        )
        .await
    }

    async fn set_incident_location_description(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let entry = ReportEntry::changed(author, now, "location description", value.clone().unwrap_or_default());
        self.apply_incident_scalar_update(
            event,
            number,
            "UPDATE incident SET location_description = $1 WHERE event = $2 AND number = $3",
            |q| q.bind(value).bind(event.as_str()).bind(number.get() as i32),
            entry,
        )
        .await
    }

    async fn set_incident_rangers(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: BTreeSet<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        let exists: Option<i32> = sqlx::query_scalar("SELECT number FROM incident WHERE event = $1 AND number = $2")
            .bind(event.as_str())
            .bind(number.get() as i32)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }
        sqlx::query("DELETE FROM incident__ranger WHERE event = $1 AND incident_number = $2")
            .bind(event.as_str())
            .bind(number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        for handle in &value {
            sqlx::query("INSERT INTO incident__ranger (event, incident_number, handle) VALUES ($1, $2, $3)")
                .bind(event.as_str())
                .bind(number.get() as i32)
                .bind(handle)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let entry = ReportEntry::changed_set(author, now, "Rangers", value.clone());
        Self::insert_incident_entry(&mut tx, event, number, &entry).await?;
        Self::bump_incident_version(&mut tx, event, number).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::Incident {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn set_incident_incident_types(
        &self,
        event: &EventId,
        number: IncidentNumber,
        value: BTreeSet<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        let current = self.load_incident_types_for(event, number).await?;
        for name in &value {
            let row: Option<(bool,)> = sqlx::query_as("SELECT hidden FROM incident_type WHERE name = $1")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
            match row {
                None => return Err(StorageError::Validation(format!("unknown incident type: {name}"))),
                Some((true,)) if !current.contains(name) => {
                    return Err(StorageError::Validation(format!(
                        "incident type is hidden and cannot be freshly assigned: {name}"
                    )));
                }
                _ => {}
            }
        }
        sqlx::query("DELETE FROM incident__incident_type WHERE event = $1 AND incident_number = $2")
            .bind(event.as_str())
            .bind(number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        for name in &value {
            sqlx::query(
                "INSERT INTO incident__incident_type (event, incident_number, incident_type_id) VALUES ($1, $2, $3)",
            )
            .bind(event.as_str())
            .bind(number.get() as i32)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let entry = ReportEntry::changed_set(author, now, "Incident Types", value.clone());
        Self::insert_incident_entry(&mut tx, event, number, &entry).await?;
        Self::bump_incident_version(&mut tx, event, number).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::Incident {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn add_report_entries_to_incident(
        &self,
        event: &EventId,
        number: IncidentNumber,
        entries: Vec<ReportEntry>,
        _author: &str,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        for entry in &entries {
            Self::insert_incident_entry(&mut tx, event, number, entry).await?;
        }
        Self::bump_incident_version(&mut tx, event, number).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::Incident {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn field_reports(&self, event: &EventId) -> Result<Vec<FieldReport>, StorageError> {
        let rows: Vec<rows::FieldReportRow> =
            sqlx::query_as("SELECT event, number, created, summary FROM incident_report WHERE event = $1 ORDER BY number")
                .bind(event.as_str())
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate_field_report(row).await?);
        }
        Ok(out)
    }

    async fn field_report_with_number(
        &self,
        event: &EventId,
        number: FieldReportNumber,
    ) -> Result<Option<FieldReport>, StorageError> {
        let row: Option<rows::FieldReportRow> = sqlx::query_as(
            "SELECT event, number, created, summary FROM incident_report WHERE event = $1 AND number = $2",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        match row {
            Some(row) => Ok(Some(self.hydrate_field_report(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_field_report(&self, mut report: FieldReport, _author: &str) -> Result<FieldReport, StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query("INSERT INTO event (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(report.event.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let next: i32 = sqlx::query_scalar(
            "UPDATE event SET max_incident_report_number = max_incident_report_number + 1
             WHERE name = $1 RETURNING max_incident_report_number",
        )
        .bind(report.event.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        let number = FieldReportNumber::new(next as u32)?;
        report.number = number;
        sqlx::query("INSERT INTO incident_report (event, number, created, summary) VALUES ($1, $2, $3, $4)")
            .bind(report.event.as_str())
            .bind(number.get() as i32)
            .bind(report.created)
            .bind(&report.summary)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        for entry in &report.report_entries {
            Self::insert_field_report_entry(&mut tx, &report.event, number, entry).await?;
        }
        if let Some(incident_number) = report.incident {
            sqlx::query(
                "INSERT INTO incident__incident_report (event, incident_number, incident_report_number) VALUES ($1, $2, $3)",
            )
            .bind(report.event.as_str())
            .bind(incident_number.get() as i32)
            .bind(number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::FieldReport {
                event: report.event.clone(),
                number,
            })
            .await;
        Ok(report)
    }

    async fn import_field_report(&self, report: FieldReport) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query("INSERT INTO event (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(report.event.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT number FROM incident_report WHERE event = $1 AND number = $2")
                .bind(report.event.as_str())
                .bind(report.number.get() as i32)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        if existing.is_some() {
            return Err(StorageError::Conflict(format!(
                "field report number {} already in use",
                report.number
            )));
        }
        sqlx::query("INSERT INTO incident_report (event, number, created, summary) VALUES ($1, $2, $3, $4)")
            .bind(report.event.as_str())
            .bind(report.number.get() as i32)
            .bind(report.created)
            .bind(&report.summary)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        for entry in &report.report_entries {
            Self::insert_field_report_entry(&mut tx, &report.event, report.number, entry).await?;
        }
        sqlx::query("UPDATE event SET max_incident_report_number = GREATEST(max_incident_report_number, $2) WHERE name = $1")
            .bind(report.event.as_str())
            .bind(report.number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    async fn set_field_report_summary(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        value: Option<String>,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        let updated = sqlx::query("UPDATE incident_report SET summary = $1 WHERE event = $2 AND number = $3")
            .bind(&value)
            .bind(event.as_str())
            .bind(number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        let entry = ReportEntry::changed(author, now, "summary", value.unwrap_or_default());
        Self::insert_field_report_entry(&mut tx, event, number, &entry).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::FieldReport {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn add_report_entries_to_field_report(
        &self,
        event: &EventId,
        number: FieldReportNumber,
        entries: Vec<ReportEntry>,
        _author: &str,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        for entry in &entries {
            Self::insert_field_report_entry(&mut tx, event, number, entry).await?;
        }
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
        self.sink
            .notify(StoreWrite::FieldReport {
                event: event.clone(),
                number,
            })
            .await;
        Ok(())
    }

    async fn attach_field_report_to_incident(
        &self,
        event: &EventId,
        report_number: FieldReportNumber,
        incident_number: IncidentNumber,
        author: &str,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        let incident_exists: Option<i32> =
            sqlx::query_scalar("SELECT number FROM incident WHERE event = $1 AND number = $2")
                .bind(event.as_str())
                .bind(incident_number.get() as i32)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        if incident_exists.is_none() {
            return Err(StorageError::NotFound);
        }
        let report_exists: Option<i32> =
            sqlx::query_scalar("SELECT number FROM incident_report WHERE event = $1 AND number = $2")
                .bind(event.as_str())
                .bind(report_number.get() as i32)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        if report_exists.is_none() {
            return Err(StorageError::NotFound);
        }
        sqlx::query("DELETE FROM incident__incident_report WHERE event = $1 AND incident_report_number = $2")
            .bind(event.as_str())
            .bind(report_number.get() as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        sqlx::query(
            "INSERT INTO incident__incident_report (event, incident_number, incident_report_number) VALUES ($1, $2, $3)",
        )
        .bind(event.as_str())
        .bind(incident_number.get() as i32)
        .bind(report_number.get() as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        let entry = ReportEntry::changed(author, now, "attached incident", incident_number.get());
        Self::insert_field_report_entry(&mut tx, event, report_number, &entry).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
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
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Io(e.to_string()))?;
        let previous: Option<i32> = sqlx::query_scalar(
            "DELETE FROM incident__incident_report WHERE event = $1 AND incident_report_number = $2 RETURNING incident_number",
        )
        .bind(event.as_str())
        .bind(report_number.get() as i32)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        let entry = ReportEntry::changed(author, now, "attached incident", "none");
        Self::insert_field_report_entry(&mut tx, event, report_number, &entry).await?;
        tx.commit().await.map_err(|e| StorageError::Io(e.to_string()))?;
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
                    number: IncidentNumber::new(incident_number as u32)?,
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
        let rows: Vec<i32> = sqlx::query_scalar(
            "SELECT incident_number FROM incident__incident_report WHERE event = $1 AND incident_report_number = $2",
        )
        .bind(event.as_str())
        .bind(number.get() as i32)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
        rows.into_iter()
            .map(|n| Ok(IncidentNumber::new(n as u32)?))
            .collect()
    }

    async fn export(&self) -> Result<ImsExport, StorageError> {
        let mut export = ImsExport::new();
        export.incident_types = self.incident_types(true).await?;
        let events = self.events().await?;
        for event in events {
            let access = EventAccess {
                readers: self.readers(&event).await?,
                writers: self.writers(&event).await?,
                reporters: self.reporters(&event).await?,
            };
            export.events.push(ExportedEvent {
                event: event.clone(),
                access,
                concentric_streets: self.concentric_streets(&event).await?,
                incidents: self.incidents(&event).await?,
                incident_reports: self.field_reports(&event).await?,
            });
        }
        Ok(export)
    }

    async fn import(&self, export: ImsExport) -> Result<(), StorageError> {
        let existing_events = self.events().await?;
        let existing_types = self.incident_types(true).await?;
        let is_empty = existing_events.is_empty()
            && existing_types
                .iter()
                .all(|t| SYSTEM_INCIDENT_TYPES.contains(&t.name.as_str()));
        if !is_empty {
            return Err(StorageError::Conflict("import requires an empty store".to_string()));
        }
        for t in export.incident_types {
            self.create_incident_type(&t.name, t.hidden).await?;
        }
        for exported in export.events {
            self.create_event(&exported.event).await?;
            self.set_readers(&exported.event, exported.access.readers).await?;
            self.set_writers(&exported.event, exported.access.writers).await?;
            self.set_reporters(&exported.event, exported.access.reporters).await?;
            for (id, name) in exported.concentric_streets {
                self.create_concentric_street(&exported.event, &id, &name).await?;
            }
            for incident in exported.incidents {
                self.import_incident(incident).await?;
            }
            for report in exported.incident_reports {
                self.import_field_report(report).await?;
            }
        }
        Ok(())
    }
}

impl PostgresStore {
    async fn insert_incident_row(tx: &mut Transaction<'_, Postgres>, incident: &Incident) -> Result<(), StorageError> {
        let (kind, concentric, hour, minute, description) = location_columns(&incident.location);
        let name = incident.location.as_ref().and_then(|l| l.name.clone());
        sqlx::query(
            "INSERT INTO incident
                (event, number, version, created, priority, state, summary,
                 location_name, location_type, location_concentric,
                 location_radial_hour, location_radial_minute, location_description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(incident.event.as_str())
        .bind(incident.number.get() as i32)
        .bind(incident.version as i64)
        .bind(incident.created)
        .bind(incident.priority.get() as i16)
        .bind(incident.state.external_name())
        .bind(&incident.summary)
        .bind(name)
        .bind(kind)
        .bind(concentric)
        .bind(hour)
        .bind(minute)
        .bind(description)
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;

        for handle in &incident.ranger_handles {
            sqlx::query("INSERT INTO incident__ranger (event, incident_number, handle) VALUES ($1, $2, $3)")
                .bind(incident.event.as_str())
                .bind(incident.number.get() as i32)
                .bind(handle)
                .execute(&mut **tx)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        for type_name in &incident.incident_types {
            sqlx::query(
                "INSERT INTO incident__incident_type (event, incident_number, incident_type_id) VALUES ($1, $2, $3)",
            )
            .bind(incident.event.as_str())
            .bind(incident.number.get() as i32)
            .bind(type_name)
            .execute(&mut **tx)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        Ok(())
    }
}
