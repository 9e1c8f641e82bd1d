//! Attendance dedup gate: at most one record per identity per calendar day.

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// One attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub identity: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub created_at: DateTime<Local>,
}

impl AttendanceRecord {
    /// New record for `identity` stamped with `now` (caller's local clock).
    pub fn new(identity: &str, now: DateTime<Local>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            date: now.date_naive(),
            time: now.time(),
            created_at: now,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store already holds a record for this identity and date.
    #[error("attendance for {identity} on {date} already recorded")]
    Conflict { identity: String, date: NaiveDate },
    #[error("attendance store: {0}")]
    Backend(String),
}

/// The subset of a persistent log store the gate needs.
pub trait AttendanceStore {
    fn find_one_by(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError>;
}

/// Decision of [`DedupGate::record_if_absent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A new record was written.
    Accepted(AttendanceRecord),
    /// A record already existed for that day; nothing was written. Carries the
    /// existing record when the store could return it.
    AlreadyPresent(Option<AttendanceRecord>),
}

pub struct DedupGate<S> {
    store: S,
}

impl<S: AttendanceStore> DedupGate<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write a record for `identity` unless one exists for `now`'s date.
    ///
    /// Check-then-write, not atomic: two concurrent calls for the same
    /// identity and day can both see "absent" and both insert. Stores that
    /// enforce uniqueness report [`StoreError::Conflict`] for the loser,
    /// which is treated as `AlreadyPresent`.
    pub fn record_if_absent(
        &self,
        identity: &str,
        now: DateTime<Local>,
    ) -> Result<Decision, StoreError> {
        let date = now.date_naive();
        if let Some(existing) = self.store.find_one_by(identity, date)? {
            tracing::debug!(identity, %date, "attendance already recorded");
            return Ok(Decision::AlreadyPresent(Some(existing)));
        }

        let record = AttendanceRecord::new(identity, now);
        match self.store.insert(&record) {
            Ok(()) => {
                tracing::info!(identity, %date, time = %record.time, "attendance recorded");
                Ok(Decision::Accepted(record))
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(identity, %date, "attendance recorded concurrently");
                Ok(Decision::AlreadyPresent(None))
            }
            Err(e) => Err(e),
        }
    }
}

/// Vec-backed store with no uniqueness enforcement.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AttendanceStore for MemoryStore {
    fn find_one_by(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.identity == identity && r.date == date)
            .cloned())
    }

    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

impl<S: AttendanceStore + ?Sized> AttendanceStore for &S {
    fn find_one_by(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        (**self).find_one_by(identity, date)
    }

    fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }
}
