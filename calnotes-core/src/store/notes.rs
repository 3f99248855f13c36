use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, params};

use super::{Store, to_timestamp};
use crate::date::format_date;
use crate::error::{CalNotesError, CalNotesResult};
use crate::model::{Note, NoteId, UserId, validate_note_content};

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: NoteId(row.get("id")?),
        date: row.get("date")?,
        content: row.get("content")?,
    })
}

impl Store {
    /// All of a user's notes, ordered by date then creation.
    pub fn list_notes(&self, user: UserId) -> CalNotesResult<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, content FROM notes WHERE user_id = ?1 ORDER BY date, id",
            )?;
            let notes = stmt
                .query_map(params![user.0], note_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    /// A user's notes between `from` and `to`, inclusive.
    pub fn notes_in_range(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CalNotesResult<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, content FROM notes
                 WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date, id",
            )?;
            let notes = stmt
                .query_map(
                    params![user.0, format_date(from), format_date(to)],
                    note_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    /// Append a note on `date`. Existing notes on the same date are kept.
    pub fn add_note(
        &self,
        user: UserId,
        date: NaiveDate,
        content: &str,
        now: DateTime<Utc>,
    ) -> CalNotesResult<Note> {
        let content = validate_note_content(content)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (user_id, date, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![user.0, format_date(date), content, to_timestamp(now)],
            )?;
            Ok(Note {
                id: NoteId(conn.last_insert_rowid()),
                date,
                content: content.to_string(),
            })
        })
    }

    pub fn update_note(
        &self,
        user: UserId,
        id: NoteId,
        content: &str,
        now: DateTime<Utc>,
    ) -> CalNotesResult<Note> {
        let content = validate_note_content(content)?;
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notes SET content = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
                params![id.0, user.0, content, to_timestamp(now)],
            )?;
            if updated == 0 {
                return Err(note_not_found(id));
            }
            let note = conn.query_row(
                "SELECT id, date, content FROM notes WHERE id = ?1 AND user_id = ?2",
                params![id.0, user.0],
                note_from_row,
            )?;
            Ok(note)
        })
    }

    pub fn delete_note(&self, user: UserId, id: NoteId) -> CalNotesResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
                params![id.0, user.0],
            )?;
            if deleted == 0 {
                return Err(note_not_found(id));
            }
            Ok(())
        })
    }

    /// Delete every note the user has on `date`, returning how many went.
    pub fn delete_notes_on(&self, user: UserId, date: NaiveDate) -> CalNotesResult<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notes WHERE user_id = ?1 AND date = ?2",
                params![user.0, format_date(date)],
            )?;
            if deleted == 0 {
                return Err(CalNotesError::NotFound(format!("Note on {}", format_date(date))));
            }
            Ok(deleted)
        })
    }
}

fn note_not_found(id: NoteId) -> CalNotesError {
    CalNotesError::NotFound(format!("Note {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_with_users() -> (Store, UserId, UserId) {
        let store = Store::open_in_memory().unwrap();
        let alice = store.insert_user("alice", "h", Utc::now()).unwrap().id;
        let bob = store.insert_user("bob", "h", Utc::now()).unwrap().id;
        (store, alice, bob)
    }

    #[test]
    fn test_multiple_notes_per_date() {
        let (store, alice, _) = store_with_users();
        let first = store.add_note(alice, date(2025, 1, 1), "one", Utc::now()).unwrap();
        let second = store.add_note(alice, date(2025, 1, 1), "two", Utc::now()).unwrap();
        assert_ne!(first.id, second.id);

        let notes = store.list_notes(alice).unwrap();
        assert_eq!(notes, vec![first, second]);
    }

    #[test]
    fn test_delete_missing_note_is_not_found() {
        let (store, alice, _) = store_with_users();
        let err = store.delete_note(alice, NoteId(42)).unwrap_err();
        assert!(matches!(err, CalNotesError::NotFound(_)));

        let err = store.delete_notes_on(alice, date(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, CalNotesError::NotFound(_)));
    }

    #[test]
    fn test_delete_note_removes_it_from_list() {
        let (store, alice, _) = store_with_users();
        let keep = store.add_note(alice, date(2025, 1, 1), "keep", Utc::now()).unwrap();
        let gone = store.add_note(alice, date(2025, 1, 1), "gone", Utc::now()).unwrap();

        store.delete_note(alice, gone.id).unwrap();
        assert_eq!(store.list_notes(alice).unwrap(), vec![keep]);
    }

    #[test]
    fn test_delete_notes_on_date() {
        let (store, alice, _) = store_with_users();
        store.add_note(alice, date(2025, 1, 1), "a", Utc::now()).unwrap();
        store.add_note(alice, date(2025, 1, 1), "b", Utc::now()).unwrap();
        let other = store.add_note(alice, date(2025, 1, 2), "c", Utc::now()).unwrap();

        assert_eq!(store.delete_notes_on(alice, date(2025, 1, 1)).unwrap(), 2);
        assert_eq!(store.list_notes(alice).unwrap(), vec![other]);
    }

    #[test]
    fn test_notes_are_scoped_to_user() {
        let (store, alice, bob) = store_with_users();
        let note = store.add_note(alice, date(2025, 1, 1), "private", Utc::now()).unwrap();

        assert!(store.list_notes(bob).unwrap().is_empty());
        assert!(matches!(
            store.update_note(bob, note.id, "hijack", Utc::now()).unwrap_err(),
            CalNotesError::NotFound(_)
        ));
        assert!(matches!(
            store.delete_note(bob, note.id).unwrap_err(),
            CalNotesError::NotFound(_)
        ));
        assert_eq!(store.list_notes(alice).unwrap()[0].content, "private");
    }

    #[test]
    fn test_update_note() {
        let (store, alice, _) = store_with_users();
        let note = store.add_note(alice, date(2025, 5, 5), "draft", Utc::now()).unwrap();
        let updated = store.update_note(alice, note.id, "final", Utc::now()).unwrap();
        assert_eq!(updated.id, note.id);
        assert_eq!(updated.date, note.date);
        assert_eq!(updated.content, "final");
    }

    #[test]
    fn test_notes_in_range() {
        let (store, alice, _) = store_with_users();
        store.add_note(alice, date(2025, 1, 31), "jan", Utc::now()).unwrap();
        store.add_note(alice, date(2025, 2, 14), "feb", Utc::now()).unwrap();
        let feb = store
            .notes_in_range(alice, date(2025, 2, 1), date(2025, 2, 28))
            .unwrap();
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].content, "feb");
    }
}
