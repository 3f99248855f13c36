use chrono::{DateTime, Utc};
use log::debug;
use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::{OptionalExtension, params};

use super::{Store, from_timestamp, to_timestamp};
use crate::error::CalNotesResult;
use crate::model::{Session, SessionPolicy, User, UserId};

const TOKEN_BYTES: usize = 32;

/// A fresh random session token, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Store {
    /// Start a session for `user`. The user's own expired sessions are
    /// dropped in the same transaction.
    pub fn create_session(
        &self,
        user: &User,
        policy: &SessionPolicy,
        now: DateTime<Utc>,
    ) -> CalNotesResult<Session> {
        let token = generate_token();
        let expires_at = from_timestamp(to_timestamp(policy.expiry_from(now)?))?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let purged = tx.execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND expires_at <= ?2",
                params![user.id.0, to_timestamp(now)],
            )?;
            tx.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, user.id.0, to_timestamp(now), to_timestamp(expires_at)],
            )?;
            tx.commit()?;
            if purged > 0 {
                debug!("dropped {} expired sessions for user={}", purged, user.username);
            }
            Ok(())
        })?;

        Ok(Session {
            token,
            user_id: user.id,
            username: user.username.clone(),
            expires_at,
        })
    }

    /// Look up a live session. An expired session is deleted and reported
    /// as absent.
    pub fn find_session(&self, token: &str, now: DateTime<Utc>) -> CalNotesResult<Option<Session>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT s.user_id, u.username, s.expires_at
                     FROM sessions s JOIN users u ON u.id = s.user_id
                     WHERE s.token = ?1",
                    params![token],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            let Some((user_id, username, expires_at)) = row else {
                return Ok(None);
            };

            let session = Session {
                token: token.to_string(),
                user_id: UserId(user_id),
                username,
                expires_at: from_timestamp(expires_at)?,
            };

            if session.is_expired(now) {
                debug!("dropping expired session for user={}", session.username);
                conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
                return Ok(None);
            }

            Ok(Some(session))
        })
    }

    /// Move a session's expiry. Returns false if the session is gone.
    pub fn extend_session(&self, token: &str, expires_at: DateTime<Utc>) -> CalNotesResult<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE sessions SET expires_at = ?2 WHERE token = ?1",
                params![token, to_timestamp(expires_at)],
            )?;
            Ok(updated > 0)
        })
    }

    /// Invalidate a session immediately. Returns false if it did not exist.
    pub fn delete_session(&self, token: &str) -> CalNotesResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(deleted > 0)
        })
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> CalNotesResult<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![to_timestamp(now)],
            )?;
            Ok(deleted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_with_user() -> (Store, User) {
        let store = Store::open_in_memory().unwrap();
        let user = store.insert_user("alice", "h", Utc::now()).unwrap();
        (store, user)
    }

    #[test]
    fn test_session_round_trip() {
        let (store, user) = store_with_user();
        let now = Utc::now();
        let session = store.create_session(&user, &SessionPolicy::default(), now).unwrap();
        assert_eq!(session.token.len(), TOKEN_BYTES * 2);

        let found = store.find_session(&session.token, now).unwrap().unwrap();
        assert_eq!(found, session);
        assert_eq!(found.username, "alice");
    }

    #[test]
    fn test_tokens_are_unique() {
        let (store, user) = store_with_user();
        let a = store.create_session(&user, &SessionPolicy::default(), Utc::now()).unwrap();
        let b = store.create_session(&user, &SessionPolicy::default(), Utc::now()).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_expired_session_is_absent_and_removed() {
        let (store, user) = store_with_user();
        let now = Utc::now();
        let policy = SessionPolicy::new(Duration::days(1), false);
        let session = store.create_session(&user, &policy, now).unwrap();

        let later = now + Duration::days(2);
        assert!(store.find_session(&session.token, later).unwrap().is_none());
        assert!(!store.delete_session(&session.token).unwrap());
    }

    #[test]
    fn test_extend_session() {
        let (store, user) = store_with_user();
        let now = Utc::now();
        let policy = SessionPolicy::new(Duration::days(1), true);
        let session = store.create_session(&user, &policy, now).unwrap();

        let later = now + Duration::hours(20);
        assert!(store.extend_session(&session.token, policy.expiry_from(later).unwrap()).unwrap());
        assert!(
            store
                .find_session(&session.token, now + Duration::hours(30))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_delete_session() {
        let (store, user) = store_with_user();
        let session = store.create_session(&user, &SessionPolicy::default(), Utc::now()).unwrap();
        assert!(store.delete_session(&session.token).unwrap());
        assert!(store.find_session(&session.token, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_purge_expired_sessions() {
        let (store, user) = store_with_user();
        let now = Utc::now();
        let short = SessionPolicy::new(Duration::hours(1), false);
        store.create_session(&user, &short, now).unwrap();
        let kept = store.create_session(&user, &SessionPolicy::default(), now).unwrap();

        assert_eq!(store.purge_expired_sessions(now + Duration::hours(2)).unwrap(), 1);
        assert!(store.find_session(&kept.token, now).unwrap().is_some());
    }

    #[test]
    fn test_new_session_drops_the_users_expired_sessions() {
        let (store, alice) = store_with_user();
        let bob = store.insert_user("bob", "h", Utc::now()).unwrap();
        let now = Utc::now();
        let short = SessionPolicy::new(Duration::hours(1), false);
        let stale = store.create_session(&alice, &short, now).unwrap();
        store.create_session(&bob, &short, now).unwrap();

        let later = now + Duration::hours(2);
        let fresh = store.create_session(&alice, &SessionPolicy::default(), later).unwrap();

        assert_eq!(store.probe().unwrap().sessions, 2);
        assert!(!store.delete_session(&stale.token).unwrap());
        assert!(store.find_session(&fresh.token, later).unwrap().is_some());
    }
}
