pub mod backend;
pub mod json_file;
pub mod migrations;
pub mod sqlite;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{AppConfig, BackendKind};
pub use backend::Backend;

/// Opens whichever backend the config selects, creating its directory first.
pub fn open_backend(config: &AppConfig) -> Result<Arc<dyn Backend>> {
    let path = config.store_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    log::debug!("Opening {:?} store at {:?}", config.storage.backend, path);
    Ok(match config.storage.backend {
        BackendKind::Sqlite => Arc::new(sqlite::SqliteBackend::open(&path)?),
        BackendKind::Json => Arc::new(json_file::JsonFileBackend::open(&path)?),
    })
}
