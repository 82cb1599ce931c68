pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod preferences;
pub mod query;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use crate::config::StoreConfig;
pub use crate::errors::{AppError, AppResult};
pub use crate::models::{Note, NoteColor};
pub use crate::preferences::{PreferenceStore, PreferenceStream};
pub use crate::query::SortOrder;
pub use crate::store::{ChangeEvent, ChangeKind, LiveQuery, NoteStore};
pub use crate::telemetry::init_tracing;

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NotesCore {
    pub notes: Arc<NoteStore>,
    pub preferences: Arc<PreferenceStore>,
}

impl NotesCore {
    pub fn open(config: &StoreConfig) -> AppResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let notes = NoteStore::shared(&config.database_path())?;
        let preferences = PreferenceStore::shared(&config.preferences_path())?;
        tracing::info!(data_dir = %config.data_dir.display(), "notes core opened");

        Ok(Self { notes, preferences })
    }
}
