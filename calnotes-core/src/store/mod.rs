//! SQLite-backed persistence for users, events, notes, and sessions.
//!
//! A `Store` is an explicit handle created at process start and passed to
//! every operation. All access goes through one connection behind a mutex,
//! so writes are serialized. Every event and note statement is filtered by
//! `user_id`; there is no way to reach another user's rows through this API.

mod events;
mod migrations;
mod notes;
mod sessions;
mod users;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};

use crate::error::{CalNotesError, CalNotesResult};

pub use migrations::latest_version;

/// Row counts reported by [`Store::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub users: u64,
    pub events: u64,
    pub notes: u64,
    pub sessions: u64,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) the database file and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> CalNotesResult<Self> {
        let path = path.as_ref();
        let started = Instant::now();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalNotesError::Store(format!(
                    "Could not create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let result = Connection::open(path)
            .map_err(CalNotesError::from)
            .and_then(Self::bootstrap);

        match &result {
            Ok(_) => info!(
                "store opened path={} duration_ms={}",
                path.display(),
                started.elapsed().as_millis()
            ),
            Err(e) => error!("store open failed path={} error={}", path.display(), e),
        }

        result
    }

    pub fn open_in_memory() -> CalNotesResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> CalNotesResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> CalNotesResult<T>,
    ) -> CalNotesResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| CalNotesError::Store("store connection lock poisoned".into()))?;
        f(&mut conn)
    }

    /// Take the write lock, read row counts, and roll back.
    ///
    /// Fails if the database cannot be written to.
    pub fn probe(&self) -> CalNotesResult<StoreStats> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let count = |table: &str| -> CalNotesResult<u64> {
                let n: i64 =
                    tx.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                Ok(n as u64)
            };
            let stats = StoreStats {
                users: count("users")?,
                events: count("events")?,
                notes: count("notes")?,
                sessions: count("sessions")?,
            };
            tx.rollback()?;
            Ok(stats)
        })
    }
}

fn to_timestamp(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

fn from_timestamp(secs: i64) -> CalNotesResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| CalNotesError::Store(format!("corrupt timestamp {}", secs)))
}
