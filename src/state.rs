use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use calnotes_core::{CalNotesResult, DefaultEvents, Hasher, Store};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use log::info;

use crate::config::ServerConfig;
use crate::routes::AppError;
use crate::session::SessionCookies;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub hasher: Arc<Hasher>,
    pub cookies: Arc<SessionCookies>,
    pub defaults: Arc<DefaultEvents>,
    pub timezone: Tz,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    /// Open the configured store and build state. A store that cannot be
    /// opened is fatal: the server never starts without one.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open(&config.database_path).with_context(|| {
            format!("Could not open store at {}", config.database_path.display())
        })?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: &ServerConfig, store: Store) -> Result<Self> {
        config.validate()?;

        let purged = store.purge_expired_sessions(Utc::now())?;
        if purged > 0 {
            info!("purged {} expired sessions", purged);
        }

        Ok(AppState {
            store,
            hasher: Arc::new(Hasher::new(&config.hasher)?),
            cookies: Arc::new(SessionCookies::new(
                config.session_secret.as_bytes(),
                &config.session,
            )?),
            defaults: Arc::new(config.default_events()?),
            timezone: config.timezone()?,
            static_dir: config.static_dir.clone(),
        })
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Run a store operation on the blocking pool. SQLite access and
    /// password hashing both block.
    pub async fn run<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&Store, &Hasher) -> CalNotesResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let hasher = Arc::clone(&self.hasher);
        let result = tokio::task::spawn_blocking(move || op(&store, &hasher)).await?;
        Ok(result?)
    }
}
