//! SQLite attendance log.

use attendo_core::{AttendanceRecord, AttendanceStore, StoreError};
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS attendance (
    id         TEXT PRIMARY KEY,
    identity   TEXT NOT NULL,
    date       TEXT NOT NULL,
    time       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (identity, date)
);
CREATE INDEX IF NOT EXISTS attendance_by_date ON attendance (date);
";

const SELECT_COLUMNS: &str = "SELECT id, identity, date, time, created_at FROM attendance";

/// Attendance records in one SQLite database.
///
/// `UNIQUE(identity, date)` makes the duplicate-day check race-free at the
/// storage layer; a losing insert is reported as [`StoreError::Conflict`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL).map_err(backend)?;
        Ok(Self { conn })
    }

    /// Records for one day, newest first.
    pub fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE date = ?1 ORDER BY time DESC, created_at DESC");
        self.query(&sql, params![date.to_string()])
    }

    /// Every record, newest first.
    pub fn list_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY date DESC, time DESC, created_at DESC");
        self.query(&sql, params![])
    }

    /// Delete one record by id. Returns false if no such record existed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM attendance WHERE id = ?1", params![id])
            .map_err(backend)?;
        Ok(deleted > 0)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(backend)?;
        let rows = stmt.query_map(params, decode_row).map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}

impl AttendanceStore for SqliteStore {
    fn find_one_by(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE identity = ?1 AND date = ?2 LIMIT 1"),
                params![identity, date.to_string()],
                decode_row,
            )
            .optional()
            .map_err(backend)
    }

    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO attendance (id, identity, date, time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.identity,
                record.date.to_string(),
                record.time.to_string(),
                record.created_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::Conflict {
                    identity: record.identity.clone(),
                    date: record.date,
                })
            }
            Err(e) => Err(backend(e)),
        }
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn decode_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    fn bad(column: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
    }

    let date: String = row.get(2)?;
    let time: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(AttendanceRecord {
        id: row.get(0)?,
        identity: row.get(1)?,
        date: date.parse::<NaiveDate>().map_err(|e| bad(2, e))?,
        time: time.parse::<NaiveTime>().map_err(|e| bad(3, e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| bad(4, e))?
            .with_timezone(&Local),
    })
}
