//! Persistent entities: users, notes, and sessions.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{CalNotesError, CalNotesResult};

pub const MAX_EVENT_DESCRIPTION_CHARS: usize = 500;
pub const MAX_NOTE_CONTENT_CHARS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2id PHC string; never the plaintext password
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A free-text note attached to a date. A date may carry any number of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: NoteId,
    pub date: NaiveDate,
    pub content: String,
}

/// A server-side login session, identified by an opaque random token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// How long sessions live and whether activity extends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub lifetime: Duration,
    /// Each authenticated request pushes expiry out to `now + lifetime`
    pub sliding: bool,
}

impl SessionPolicy {
    pub const DEFAULT_LIFETIME_DAYS: i64 = 31;

    pub fn new(lifetime: Duration, sliding: bool) -> Self {
        SessionPolicy { lifetime, sliding }
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> CalNotesResult<DateTime<Utc>> {
        now.checked_add_signed(self.lifetime).ok_or_else(|| {
            CalNotesError::Validation(format!(
                "Session lifetime of {} days is out of range",
                self.lifetime.num_days()
            ))
        })
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        SessionPolicy {
            lifetime: Duration::days(Self::DEFAULT_LIFETIME_DAYS),
            sliding: false,
        }
    }
}

/// Trimmed, length-checked event description.
pub fn validate_description(description: &str) -> CalNotesResult<&str> {
    validate_text("Event description", description, MAX_EVENT_DESCRIPTION_CHARS)
}

/// Trimmed, length-checked note content.
pub fn validate_note_content(content: &str) -> CalNotesResult<&str> {
    validate_text("Note content", content, MAX_NOTE_CONTENT_CHARS)
}

fn validate_text<'a>(field: &str, value: &'a str, max_chars: usize) -> CalNotesResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CalNotesError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max_chars {
        return Err(CalNotesError::Validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    if value.contains('\0') {
        return Err(CalNotesError::Validation(format!(
            "{} contains a null byte",
            field
        )));
    }
    Ok(value)
}
