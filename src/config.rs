//! Server configuration.
//!
//! Loaded from an optional TOML file and then from `CALNOTES_*` environment
//! variables, which win. Nested keys use a double underscore, e.g.
//! `CALNOTES_SESSION__LIFETIME_DAYS=7`.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use calnotes_core::{DefaultEvents, HasherConfig, SessionPolicy};
use chrono_tz::Tz;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// Secrets shorter than this are refused at startup.
pub const MIN_SECRET_BYTES: usize = 32;

/// Upper bound on `session.lifetime_days` (ten years).
pub const MAX_SESSION_LIFETIME_DAYS: i64 = 3650;

const ENV_PREFIX: &str = "CALNOTES";
const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
const DEFAULT_COOKIE_NAME: &str = "calnotes_session";

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("calnotes").join("calnotes.db"))
        .unwrap_or_else(|| PathBuf::from("calnotes.db"))
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

#[derive(Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Key for signing session cookies. Required; there is no built-in value.
    #[serde(default)]
    pub session_secret: String,

    /// IANA timezone that decides which day is "today"
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Directory holding index.html, login.html, register.html and assets
    pub static_dir: Option<PathBuf>,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub hasher: HasherConfig,

    /// Extra default events, `"YYYY-MM-DD" = "name"`
    #[serde(default)]
    pub default_events: BTreeMap<String, String>,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_days: i64,
    pub sliding: bool,
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            lifetime_days: SessionPolicy::DEFAULT_LIFETIME_DAYS,
            sliding: false,
            secure_cookie: false,
        }
    }
}

impl SessionConfig {
    pub fn policy(&self) -> Result<SessionPolicy> {
        let lifetime = chrono::Duration::try_days(self.lifetime_days).ok_or_else(|| {
            anyhow!("session.lifetime_days {} is out of range", self.lifetime_days)
        })?;
        Ok(SessionPolicy::new(lifetime, self.sliding))
    }
}

impl ServerConfig {
    /// Default config file location (~/.config/calnotes/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calnotes");
        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from `path` (required to exist) or, when `None`,
    /// from the default location if present. Environment variables override
    /// file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::from(Self::config_path()?)
                .format(FileFormat::Toml)
                .required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Could not read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Parse configuration from a TOML string, without consulting the
    /// environment.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Reject configurations the server must not start with.
    pub fn validate(&self) -> Result<()> {
        if self.session_secret.len() < MIN_SECRET_BYTES {
            bail!(
                "session_secret must be set and at least {} bytes long \
                 (generate one with `calnotes-server gen-secret`)",
                MIN_SECRET_BYTES
            );
        }
        if self.session.lifetime_days < 1 {
            bail!("session.lifetime_days must be at least 1");
        }
        if self.session.lifetime_days > MAX_SESSION_LIFETIME_DAYS {
            bail!(
                "session.lifetime_days must be at most {}",
                MAX_SESSION_LIFETIME_DAYS
            );
        }
        if self.session.cookie_name.is_empty()
            || !self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("session.cookie_name must be non-empty and contain only [A-Za-z0-9_-]");
        }
        self.timezone()?;
        self.default_events()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{}': {}", self.timezone, e))
    }

    pub fn default_events(&self) -> Result<DefaultEvents> {
        DefaultEvents::from_config(&self.default_events).context("Invalid default_events")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_toml(&format!("session_secret = \"{SECRET}\"")).unwrap();
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.timezone, "Asia/Shanghai");
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.session.lifetime_days, 31);
        assert_eq!(config.hasher, HasherConfig::default());
        assert!(config.static_dir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let config = ServerConfig::from_toml("").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session_secret"));

        let config = ServerConfig::from_toml("session_secret = \"short\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_sections() {
        let config = ServerConfig::from_toml(&format!(
            r#"
            session_secret = "{SECRET}"
            bind = "127.0.0.1:9000"
            timezone = "Europe/Berlin"

            [session]
            lifetime_days = 7
            sliding = true

            [hasher]
            memory_kib = 64
            iterations = 1
            parallelism = 1

            [default_events]
            "2026-01-01" = "New Year"
            "#
        ))
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.session.lifetime_days, 7);
        assert!(config.session.sliding);
        assert_eq!(config.session.cookie_name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.hasher.memory_kib, 64);
        let defaults = config.default_events().unwrap();
        let new_year = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(defaults.get(new_year), Some("New Year"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_tz = ServerConfig::from_toml(&format!(
            "session_secret = \"{SECRET}\"\ntimezone = \"Mars/Olympus\""
        ))
        .unwrap();
        assert!(bad_tz.validate().is_err());

        let bad_event = ServerConfig::from_toml(&format!(
            "session_secret = \"{SECRET}\"\n[default_events]\n\"2025-02-30\" = \"nope\""
        ))
        .unwrap();
        assert!(bad_event.validate().is_err());

        let zero_lifetime = ServerConfig::from_toml(&format!(
            "session_secret = \"{SECRET}\"\n[session]\nlifetime_days = 0"
        ))
        .unwrap();
        assert!(zero_lifetime.validate().is_err());

        let bad_cookie = ServerConfig::from_toml(&format!(
            "session_secret = \"{SECRET}\"\n[session]\ncookie_name = \"a b\""
        ))
        .unwrap();
        assert!(bad_cookie.validate().is_err());
    }

    #[test]
    fn test_oversized_session_lifetime_is_rejected() {
        for days in [MAX_SESSION_LIFETIME_DAYS + 1, 100_000_000, 1_000_000_000_000_000] {
            let config = ServerConfig::from_toml(&format!(
                "session_secret = \"{SECRET}\"\n[session]\nlifetime_days = {days}"
            ))
            .unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("at most"), "{days}: {err}");
        }

        let huge = SessionConfig {
            lifetime_days: i64::MAX,
            ..SessionConfig::default()
        };
        assert!(huge.policy().is_err());

        let longest = SessionConfig {
            lifetime_days: MAX_SESSION_LIFETIME_DAYS,
            ..SessionConfig::default()
        };
        let policy = longest.policy().unwrap();
        assert!(policy.expiry_from(chrono::Utc::now()).is_ok());
    }
}
