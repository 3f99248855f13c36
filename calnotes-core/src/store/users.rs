use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use super::{Store, from_timestamp, to_timestamp};
use crate::error::{CalNotesError, CalNotesResult};
use crate::model::{User, UserId};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, i64)> {
    Ok((
        row.get("id")?,
        row.get("username")?,
        row.get("password_hash")?,
        row.get("created_at")?,
    ))
}

fn into_user(
    (id, username, password_hash, created_at): (i64, String, String, i64),
) -> CalNotesResult<User> {
    Ok(User {
        id: UserId(id),
        username,
        password_hash,
        created_at: from_timestamp(created_at)?,
    })
}

impl Store {
    /// Insert a new user. Uniqueness is enforced by the `UNIQUE` index, so
    /// two concurrent registrations of the same name cannot both succeed.
    pub fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> CalNotesResult<User> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![username, password_hash, to_timestamp(now)],
            );

            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    return Err(CalNotesError::DuplicateUsername(username.to_string()));
                }
                Err(e) => return Err(e.into()),
            }

            Ok(User {
                id: UserId(conn.last_insert_rowid()),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: from_timestamp(to_timestamp(now))?,
            })
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> CalNotesResult<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?
            .map(into_user)
            .transpose()
        })
    }
}
