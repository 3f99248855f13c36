//! Registration, login, and password hashing.
//!
//! Passwords are hashed with argon2id and a random per-password salt, and
//! stored as PHC strings. Verification reads the cost parameters from the
//! stored hash, so changing the configured costs only affects new hashes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;

use crate::error::{CalNotesError, CalNotesResult};
use crate::model::User;
use crate::store::Store;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MAX_USERNAME_CHARS: usize = 32;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_PASSWORD_BYTES: usize = 1024;

const DUMMY_PASSWORD: &str = "calnotes-unknown-user";

/// Argon2 cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        HasherConfig {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

pub struct Hasher {
    params: Params,
    /// Hash checked against when the username is unknown, so that path
    /// costs the same as a wrong password.
    dummy_hash: String,
}

impl Hasher {
    pub fn new(config: &HasherConfig) -> CalNotesResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| CalNotesError::Hashing(format!("invalid argon2 parameters: {e}")))?;
        let mut hasher = Hasher {
            params,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> CalNotesResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CalNotesError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// True iff `password` matches the stored PHC string.
    pub fn verify(&self, stored_hash: &str, password: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("unparseable password hash in store: {}", e);
                return false;
            }
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

pub fn validate_username(username: &str) -> CalNotesResult<()> {
    let chars = username.chars().count();
    if chars < MIN_USERNAME_CHARS {
        return Err(CalNotesError::Validation(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_CHARS
        )));
    }
    if chars > MAX_USERNAME_CHARS {
        return Err(CalNotesError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_CHARS
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CalNotesError::validation(
            "Username must not contain whitespace or control characters",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> CalNotesResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(CalNotesError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(CalNotesError::Validation(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

/// Create an account. Only the argon2 hash of `password` is persisted.
pub fn register(
    store: &Store,
    hasher: &Hasher,
    username: &str,
    password: &str,
) -> CalNotesResult<User> {
    validate_username(username)?;
    validate_password(password)?;

    let password_hash = hasher.hash(password)?;
    let user = store.insert_user(username, &password_hash, Utc::now())?;
    info!("registered user={} id={}", user.username, user.id);
    Ok(user)
}

/// Check a username/password pair. Unknown users and wrong passwords are
/// indistinguishable to the caller.
pub fn authenticate(
    store: &Store,
    hasher: &Hasher,
    username: &str,
    password: &str,
) -> CalNotesResult<User> {
    let Some(user) = store.find_user_by_username(username)? else {
        hasher.verify(&hasher.dummy_hash, password);
        info!("login failed: unknown user={}", username);
        return Err(CalNotesError::InvalidCredentials);
    };

    if !hasher.verify(&user.password_hash, password) {
        info!("login failed: bad password user={}", username);
        return Err(CalNotesError::InvalidCredentials);
    }

    Ok(user)
}
