use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use super::{Store, to_timestamp};
use crate::date::format_date;
use crate::error::{CalNotesError, CalNotesResult};
use crate::model::{UserId, validate_description};

impl Store {
    /// All of a user's events, keyed by date.
    pub fn list_events(&self, user: UserId) -> CalNotesResult<BTreeMap<NaiveDate, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, description FROM events WHERE user_id = ?1 ORDER BY date",
            )?;
            let rows = stmt.query_map(params![user.0], |row| {
                Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, String>(1)?))
            })?;
            Ok(rows.collect::<rusqlite::Result<_>>()?)
        })
    }

    /// A user's events between `from` and `to`, inclusive.
    pub fn events_in_range(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CalNotesResult<BTreeMap<NaiveDate, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, description FROM events
                 WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date",
            )?;
            let rows = stmt.query_map(
                params![user.0, format_date(from), format_date(to)],
                |row| Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, String>(1)?)),
            )?;
            Ok(rows.collect::<rusqlite::Result<_>>()?)
        })
    }

    /// Create or replace the user's event on `date`.
    ///
    /// Writes to different dates never interfere; for the same date the last
    /// write wins.
    pub fn upsert_event(
        &self,
        user: UserId,
        date: NaiveDate,
        description: &str,
        now: DateTime<Utc>,
    ) -> CalNotesResult<()> {
        let description = validate_description(description)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (user_id, date, description, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, date) DO UPDATE SET
                    description = excluded.description,
                    updated_at = excluded.updated_at",
                params![user.0, format_date(date), description, to_timestamp(now)],
            )?;
            Ok(())
        })
    }

    pub fn delete_event(&self, user: UserId, date: NaiveDate) -> CalNotesResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM events WHERE user_id = ?1 AND date = ?2",
                params![user.0, format_date(date)],
            )?;
            if deleted == 0 {
                return Err(CalNotesError::NotFound(format!("Event on {}", format_date(date))));
            }
            Ok(())
        })
    }
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
    fn test_upsert_replaces_same_date() {
        let (store, alice, _) = store_with_users();
        store.upsert_event(alice, date(2025, 1, 1), "first", Utc::now()).unwrap();
        store.upsert_event(alice, date(2025, 1, 1), "second", Utc::now()).unwrap();
        store.upsert_event(alice, date(2025, 1, 2), "other", Utc::now()).unwrap();

        let events = store.list_events(alice).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[&date(2025, 1, 1)], "second");
        assert_eq!(events[&date(2025, 1, 2)], "other");
    }

    #[test]
    fn test_events_are_scoped_to_user() {
        let (store, alice, bob) = store_with_users();
        store.upsert_event(alice, date(2025, 1, 1), "alice's", Utc::now()).unwrap();

        assert!(store.list_events(bob).unwrap().is_empty());
        let err = store.delete_event(bob, date(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, CalNotesError::NotFound(_)));
        assert_eq!(store.list_events(alice).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_event() {
        let (store, alice, _) = store_with_users();
        store.upsert_event(alice, date(2025, 3, 8), "party", Utc::now()).unwrap();
        store.delete_event(alice, date(2025, 3, 8)).unwrap();
        assert!(store.list_events(alice).unwrap().is_empty());

        let err = store.delete_event(alice, date(2025, 3, 8)).unwrap_err();
        assert!(matches!(err, CalNotesError::NotFound(_)));
    }

    #[test]
    fn test_events_in_range_is_inclusive() {
        let (store, alice, _) = store_with_users();
        for d in [date(2025, 1, 31), date(2025, 2, 1), date(2025, 2, 28), date(2025, 3, 1)] {
            store.upsert_event(alice, d, "x", Utc::now()).unwrap();
        }
        let feb = store
            .events_in_range(alice, date(2025, 2, 1), date(2025, 2, 28))
            .unwrap();
        assert_eq!(
            feb.keys().copied().collect::<Vec<_>>(),
            vec![date(2025, 2, 1), date(2025, 2, 28)]
        );
    }

    #[test]
    fn test_upsert_rejects_blank_description() {
        let (store, alice, _) = store_with_users();
        let err = store.upsert_event(alice, date(2025, 1, 1), "   ", Utc::now()).unwrap_err();
        assert!(matches!(err, CalNotesError::Validation(_)));
    }
}
