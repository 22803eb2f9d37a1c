//! Runtime context for CLI commands

use anyhow::{Context, Result};
use im_core::Config;
use im_db::{DbError, IdStore};
use std::path::Path;

use crate::cli::GlobalArgs;

/// Loaded configuration and an open store
pub struct RuntimeContext {
    pub config: Config,
    pub store: Box<dyn IdStore>,
}

impl RuntimeContext {
    /// Load the config, restrict it to `table` if given, and connect.
    pub async fn new(global: &GlobalArgs, table: Option<&str>) -> Result<Self> {
        let mut config = load_config(global)?;
        if let Some(table) = table {
            config.restrict_to(table)?;
        }

        let url = global
            .database_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| DbError::UnsupportedUrl {
                url: String::new(),
                reason: "set DATABASE_URL or pass --database-url".to_string(),
            })?;
        let store = im_db::connect(url)
            .await
            .context("Failed to connect to database")?;
        log::debug!("Connected to {} store", store.db_type());

        Ok(Self { config, store })
    }
}

/// Config from `--config`, or `idmig.yml` in the working directory with
/// built-in defaults when that file is absent.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    match &global.config {
        Some(path) => Config::load(Path::new(path)).context("Failed to load configuration file"),
        None => Config::load_from_dir_or_default(Path::new("."))
            .context("Failed to load configuration"),
    }
}
