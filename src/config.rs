use crate::errors::{AppError, AppResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "NOTES_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_database_file() -> String {
    "notes.db".to_string()
}

fn default_preferences_file() -> String {
    "settings.json".to_string()
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database_file: default_database_file(),
            preferences_file: default_preferences_file(),
            log_dir: None,
        }
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let parsed = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .and_then(|raw| {
                serde_json::from_str::<Self>(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))
            })
            .map_err(|error| AppError::Config(format!("{error:#}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn from_env() -> AppResult<Self> {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Config(format!("{} is not set", DATA_DIR_ENV)))?;
        let config = Self::new(data_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        for (label, name) in [
            ("databaseFile", &self.database_file),
            ("preferencesFile", &self.preferences_file),
        ] {
            if name.trim().is_empty() {
                return Err(AppError::Config(format!("{} must not be empty", label)));
            }
            if name.contains('/') || name.contains('\\') {
                return Err(AppError::Config(format!(
                    "{} must be a bare file name, got {:?}",
                    label, name
                )));
            }
        }
        if self.database_file == self.preferences_file {
            return Err(AppError::Config(
                "databaseFile and preferencesFile must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(&self.preferences_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }
}
