//! [`SqliteStore`] — SQLite implementation of the core store traits.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollcall_core::{
    status::AttendanceStatus,
    store::{AttendanceStore, CheckInInsert, IdentityRegistry, NewCheckIn, TemplateStore},
    types::{AttendanceRecord, Descriptor, FaceTemplate, GalleryEntry, Identity},
};

use crate::{schema::SCHEMA, Error, Result};

const DAY_FORMAT: &str = "%Y-%m-%d";

fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DateParse(format!("{s}: {e}")))
}

fn encode_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT).map_err(|e| Error::DateParse(format!("{s}: {e}")))
}

fn parse_status(s: &str) -> Result<AttendanceStatus> {
    AttendanceStatus::parse(s).ok_or_else(|| Error::UnknownStatus(s.to_string()))
}

/// String-typed attendance row as read from SQLite, converted to an
/// [`AttendanceRecord`] outside the connection closure.
struct RawRecord {
    record_id: String,
    identity_id: String,
    day: String,
    check_in: String,
    check_in_evidence: Option<String>,
    check_out: Option<String>,
    check_out_evidence: Option<String>,
    status: String,
    location: Option<String>,
    notes: Option<String>,
}

impl RawRecord {
    const COLUMNS: &'static str = "record_id, identity_id, day, check_in, check_in_evidence, \
         check_out, check_out_evidence, status, location, notes";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_id: row.get(0)?,
            identity_id: row.get(1)?,
            day: row.get(2)?,
            check_in: row.get(3)?,
            check_in_evidence: row.get(4)?,
            check_out: row.get(5)?,
            check_out_evidence: row.get(6)?,
            status: row.get(7)?,
            location: row.get(8)?,
            notes: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<AttendanceRecord> {
        Ok(AttendanceRecord {
            record_id: Uuid::parse_str(&self.record_id)?,
            identity_id: Uuid::parse_str(&self.identity_id)?,
            day: parse_day(&self.day)?,
            check_in: parse_dt(&self.check_in)?,
            check_in_evidence: self.check_in_evidence,
            check_out: self.check_out.as_deref().map(parse_dt).transpose()?,
            check_out_evidence: self.check_out_evidence,
            status: parse_status(&self.status)?,
            location: self.location,
            notes: self.notes,
        })
    }
}

/// Rollcall store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
    /// Open (or create) a store at `path` and run schema initialisation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store — useful for testing.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Register an identity in the local registry table.
    ///
    /// Identity CRUD proper belongs to the external people registry; this
    /// minimal insert exists for seeding and tests.
    pub async fn add_identity(&self, code: &str, display_name: &str) -> Result<Identity> {
        let identity = Identity {
            identity_id: Uuid::new_v4(),
            code: code.to_string(),
            display_name: display_name.to_string(),
            active: true,
            created_at: Utc::now(),
        };

        let id_str = identity.identity_id.to_string();
        let code = identity.code.clone();
        let name = identity.display_name.clone();
        let at_str = encode_dt(identity.created_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO identities (identity_id, code, display_name, active, created_at)
                     VALUES (?1, ?2, ?3, 1, ?4)",
                    rusqlite::params![id_str, code, name, at_str],
                )?;
                Ok(())
            })
            .await?;

        Ok(identity)
    }

    /// Mark an identity active or inactive.
    pub async fn set_active(&self, code: &str, active: bool) -> Result<bool> {
        let code = code.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE identities SET active = ?1 WHERE code = ?2",
                    rusqlite::params![active as i64, code],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(changed)
    }

    /// List all identities, active first, then by code.
    pub async fn list_identities(&self) -> Result<Vec<Identity>> {
        let raws: Vec<(String, String, String, bool, String)> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT identity_id, code, display_name, active, created_at
                     FROM identities ORDER BY active DESC, code ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter()
            .map(|(id, code, name, active, at)| {
                Ok(Identity {
                    identity_id: Uuid::parse_str(&id)?,
                    code,
                    display_name: name,
                    active,
                    created_at: parse_dt(&at)?,
                })
            })
            .collect()
    }

    async fn find_record(
        &self,
        identity_id: Uuid,
        day: NaiveDate,
        open: bool,
    ) -> Result<Option<AttendanceRecord>> {
        let id_str = identity_id.to_string();
        let day_str = encode_day(day);
        let check_out_clause = if open { "IS NULL" } else { "IS NOT NULL" };
        let sql = format!(
            "SELECT {} FROM attendance
             WHERE identity_id = ?1 AND day = ?2 AND check_out {check_out_clause}
             ORDER BY check_in DESC LIMIT 1",
            RawRecord::COLUMNS
        );

        let raw: Option<RawRecord> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(&sql, rusqlite::params![id_str, day_str], RawRecord::from_row)
                    .optional()?)
            })
            .await?;

        raw.map(RawRecord::into_record).transpose()
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl IdentityRegistry for SqliteStore {
    type Error = Error;

    async fn get_active(&self, code: &str) -> Result<Option<Identity>> {
        let code = code.to_string();

        let raw: Option<(String, String, String, String)> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT identity_id, code, display_name, created_at
                         FROM identities WHERE code = ?1 AND active = 1",
                        rusqlite::params![code],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?)
            })
            .await?;

        raw.map(|(id, code, name, at)| {
            Ok(Identity {
                identity_id: Uuid::parse_str(&id)?,
                code,
                display_name: name,
                active: true,
                created_at: parse_dt(&at)?,
            })
        })
        .transpose()
    }
}

impl TemplateStore for SqliteStore {
    type Error = Error;

    async fn get_template(&self, identity_id: Uuid) -> Result<Option<FaceTemplate>> {
        let id_str = identity_id.to_string();

        let raw: Option<(String, Option<String>, String, String)> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT descriptor_json, evidence_ref, created_at, updated_at
                         FROM face_templates WHERE identity_id = ?1",
                        rusqlite::params![id_str],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?)
            })
            .await?;

        raw.map(|(descriptor_json, evidence_ref, created_at, updated_at)| {
            let values: Vec<f32> = serde_json::from_str(&descriptor_json)?;
            Ok(FaceTemplate {
                identity_id,
                descriptor: Descriptor::new(values),
                evidence_ref,
                created_at: parse_dt(&created_at)?,
                updated_at: parse_dt(&updated_at)?,
            })
        })
        .transpose()
    }

    async fn upsert_template(
        &self,
        identity_id: Uuid,
        descriptor: &Descriptor,
        evidence_ref: Option<&str>,
    ) -> Result<FaceTemplate> {
        let now = Utc::now();
        let id_str = identity_id.to_string();
        let descriptor_json = serde_json::to_string(&descriptor.values)?;
        let evidence = evidence_ref.map(str::to_owned);
        let now_str = encode_dt(now);

        // Single-statement upsert: replacement is all-or-nothing and the
        // one-template-per-identity invariant is the primary key itself.
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO face_templates
                         (identity_id, descriptor_json, evidence_ref, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(identity_id) DO UPDATE SET
                         descriptor_json = excluded.descriptor_json,
                         evidence_ref    = excluded.evidence_ref,
                         updated_at      = excluded.updated_at",
                    rusqlite::params![id_str, descriptor_json, evidence, now_str],
                )?;
                Ok(())
            })
            .await?;

        // Re-read for the real created_at of a replaced template.
        self.get_template(identity_id)
            .await?
            .ok_or_else(|| Error::DateParse("template vanished after upsert".into()))
    }

    async fn list_gallery(&self, active_only: bool) -> Result<Vec<GalleryEntry>> {
        let raws: Vec<(String, String, String, String)> = self
            .conn
            .call(move |conn| {
                // Explicit ordering: the matcher's first-found-wins
                // tie-break depends on a stable scan order.
                let sql = format!(
                    "SELECT ft.identity_id, i.code, i.display_name, ft.descriptor_json
                     FROM face_templates ft
                     JOIN identities i ON i.identity_id = ft.identity_id
                     {}
                     ORDER BY ft.created_at ASC, ft.identity_id ASC",
                    if active_only { "WHERE i.active = 1" } else { "" }
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter()
            .map(|(id, code, display_name, raw_descriptor)| {
                Ok(GalleryEntry {
                    identity_id: Uuid::parse_str(&id)?,
                    code,
                    display_name,
                    raw_descriptor,
                })
            })
            .collect()
    }
}

impl AttendanceStore for SqliteStore {
    type Error = Error;

    async fn find_open_record(
        &self,
        identity_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        self.find_record(identity_id, day, true).await
    }

    async fn find_completed_record(
        &self,
        identity_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        self.find_record(identity_id, day, false).await
    }

    async fn insert_check_in(&self, new: NewCheckIn) -> Result<CheckInInsert> {
        let record = AttendanceRecord {
            record_id: Uuid::new_v4(),
            identity_id: new.identity_id,
            day: new.day,
            check_in: new.check_in,
            check_in_evidence: new.evidence_ref,
            check_out: None,
            check_out_evidence: None,
            status: new.status,
            location: new.location,
            notes: new.notes,
        };

        let record_id = record.record_id.to_string();
        let identity_id = record.identity_id.to_string();
        let day = encode_day(record.day);
        let check_in = encode_dt(record.check_in);
        let evidence = record.check_in_evidence.clone();
        let status = record.status.as_str();
        let location = record.location.clone();
        let notes = record.notes.clone();

        let inserted = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    "INSERT INTO attendance
                         (record_id, identity_id, day, check_in, check_in_evidence,
                          status, location, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        record_id, identity_id, day, check_in, evidence, status, location, notes,
                    ],
                );
                match result {
                    Ok(_) => Ok(true),
                    // The partial unique index on (identity_id, day) for
                    // open records turns a lost check-in race into a
                    // conflict instead of a duplicate row.
                    Err(e) if is_unique_violation(&e) => Ok(false),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        if inserted {
            Ok(CheckInInsert::Created(record))
        } else {
            Ok(CheckInInsert::OpenRecordExists)
        }
    }

    async fn complete_check_out(
        &self,
        record_id: Uuid,
        check_out: DateTime<Utc>,
        evidence_ref: Option<&str>,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<AttendanceRecord> {
        let id_str = record_id.to_string();
        let out_str = encode_dt(check_out);
        let evidence = evidence_ref.map(str::to_owned);
        let location = location.map(str::to_owned);
        let notes = notes.map(str::to_owned);

        let raw: Option<RawRecord> = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE attendance
                     SET check_out = ?1,
                         check_out_evidence = ?2,
                         location = COALESCE(?3, location),
                         notes = COALESCE(?4, notes)
                     WHERE record_id = ?5 AND check_out IS NULL",
                    rusqlite::params![out_str, evidence, location, notes, id_str],
                )?;
                if n == 0 {
                    return Ok(None);
                }
                let sql = format!(
                    "SELECT {} FROM attendance WHERE record_id = ?1",
                    RawRecord::COLUMNS
                );
                Ok(conn
                    .query_row(&sql, rusqlite::params![id_str], RawRecord::from_row)
                    .optional()?)
            })
            .await?;

        raw.map(RawRecord::into_record)
            .transpose()?
            .ok_or(Error::RecordNotFound(record_id))
    }

    async fn list_range(
        &self,
        identity_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let id_str = identity_id.to_string();
        let from_str = encode_day(from);
        let to_str = encode_day(to);

        let raws: Vec<RawRecord> = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM attendance
                     WHERE identity_id = ?1 AND day >= ?2 AND day <= ?3
                     ORDER BY day ASC, check_in ASC",
                    RawRecord::COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![id_str, from_str, to_str],
                        RawRecord::from_row,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter().map(RawRecord::into_record).collect()
    }
}
