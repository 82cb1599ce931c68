use crate::errors::{AppError, AppResult};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One lazily constructed instance per backing file. The map lock only guards
/// cell lookup; `init` runs inside the cell, at most once per success.
pub struct SharedRegistry<T> {
    cells: Mutex<HashMap<PathBuf, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> SharedRegistry<T> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_try_init<F>(&self, path: &Path, init: F) -> AppResult<Arc<T>>
    where
        F: FnOnce(&Path) -> AppResult<T>,
    {
        let key = registry_key(path)?;
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .map_err(|_| AppError::Internal("registry mutex poisoned".to_string()))?;
            cells.entry(key.clone()).or_default().clone()
        };

        cell.get_or_try_init(|| {
            tracing::debug!(path = %key.display(), "constructing shared instance");
            init(&key).map(Arc::new)
        })
        .cloned()
    }
}

// canonical parent + file name; the file itself may not exist yet
fn registry_key(path: &Path) -> AppResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Config(format!("{} does not name a file", path.display())))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    Ok(fs::canonicalize(&parent)?.join(file_name))
}
