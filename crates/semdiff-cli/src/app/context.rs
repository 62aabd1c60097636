//! Application context for the SemDiff CLI.
//!
//! Bundles CLI arguments with the lazily loaded config file and the opened
//! database, so handlers do not thread them through every call.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use once_cell::unsync::OnceCell;
use tracing::debug;

use semdiff_core::store::AppStore;
use semdiff_core::SqliteStorage;

use crate::cli::Cli;
use crate::config::{read_config, SemdiffConfig};
use crate::errors::CliError;
use crate::ui::UiContext;

use super::resolver::{missing_database_message, resolve_config_path, resolve_database_path};

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<SemdiffConfig>,
    storage: OnceCell<Arc<SqliteStorage>>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
            storage: OnceCell::new(),
        }
    }

    pub fn cli(&self) -> &Cli {
        self.cli
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Config file contents; defaults when the file does not exist.
    pub fn config(&self) -> anyhow::Result<&SemdiffConfig> {
        self.config.get_or_try_init(|| {
            let path = resolve_config_path()?;
            if path.exists() {
                read_config(&path)
            } else {
                Ok(SemdiffConfig::default())
            }
        })
    }

    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        resolve_database_path(self.cli.db.as_deref(), self.config()?)
    }

    pub fn sync_timeout(&self) -> anyhow::Result<Duration> {
        Ok(Duration::from_secs(self.config()?.sync.timeout_seconds))
    }

    /// Open the existing database, migrating it if needed.
    pub fn storage(&self) -> anyhow::Result<Arc<SqliteStorage>> {
        let storage = self.storage.get_or_try_init(|| {
            let path = self.database_path()?;
            if !path.exists() {
                return Err(anyhow::Error::new(CliError::not_found(
                    missing_database_message(&path),
                    "",
                )));
            }
            debug!(path = %path.display(), "opening database");
            Ok::<_, anyhow::Error>(Arc::new(SqliteStorage::open(&path)?))
        })?;
        Ok(Arc::clone(storage))
    }

    /// Application store over the opened database with students and scales
    /// loaded.
    pub fn app_store(&self) -> anyhow::Result<AppStore<SqliteStorage>> {
        let mut store = AppStore::new(self.storage()?);
        store.load_students()?;
        store.load_scales()?;
        Ok(store)
    }

    pub fn ui_context(&self, json: bool) -> UiContext {
        UiContext::detect(json, self.cli.no_color)
    }
}
