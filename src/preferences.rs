use crate::errors::{AppError, AppResult};
use crate::registry::SharedRegistry;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub const DARK_MODE_KEY: &str = "dark_mode";

static PREFERENCE_STORES: Lazy<SharedRegistry<PreferenceStore>> = Lazy::new(SharedRegistry::new);

#[derive(Debug)]
pub struct PreferenceStore {
    state: Arc<PreferenceState>,
}

#[derive(Debug)]
struct PreferenceState {
    path: PathBuf,
    document: Mutex<Map<String, Value>>,
    dark_mode: watch::Sender<bool>,
}

impl PreferenceStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let document = read_document(path)?;
        let dark_mode = match document.get(DARK_MODE_KEY) {
            Some(Value::Bool(value)) => *value,
            Some(other) => {
                tracing::warn!(value = %other, "dark_mode is not a boolean; using default");
                false
            }
            None => false,
        };
        let (sender, _) = watch::channel(dark_mode);

        Ok(Self {
            state: Arc::new(PreferenceState {
                path: path.to_path_buf(),
                document: Mutex::new(document),
                dark_mode: sender,
            }),
        })
    }

    pub fn shared(path: &Path) -> AppResult<Arc<Self>> {
        PREFERENCE_STORES.get_or_try_init(path, Self::open)
    }

    pub fn dark_mode(&self) -> bool {
        *self.state.dark_mode.borrow()
    }

    pub fn dark_mode_enabled(&self) -> PreferenceStream {
        PreferenceStream {
            receiver: self.state.dark_mode.subscribe(),
            started: false,
        }
    }

    // The file write and the live value update happen together on the blocking
    // task, so dropping this future cannot leave them disagreeing.
    pub async fn set_dark_mode(&self, enabled: bool) -> AppResult<()> {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || state.save_dark_mode(enabled)).await?
    }
}

impl PreferenceState {
    fn save_dark_mode(&self, enabled: bool) -> AppResult<()> {
        let mut document = self
            .document
            .lock()
            .map_err(|_| AppError::Internal("preferences mutex poisoned".to_string()))?;
        let mut next = document.clone();
        next.insert(DARK_MODE_KEY.to_string(), Value::Bool(enabled));

        write_document(&self.path, &next).inspect_err(|error| {
            tracing::error!(path = %self.path.display(), error = %error, "failed to persist preferences");
        })?;

        *document = next;
        self.dark_mode.send_replace(enabled);
        tracing::info!(dark_mode = enabled, "preference saved");
        Ok(())
    }
}

/// Current value first, then the newest saved value after each save.
pub struct PreferenceStream {
    receiver: watch::Receiver<bool>,
    started: bool,
}

impl PreferenceStream {
    pub async fn next(&mut self) -> Option<bool> {
        if self.started {
            self.receiver.changed().await.ok()?;
        }
        self.started = true;
        Some(*self.receiver.borrow_and_update())
    }
}

fn read_document(path: &Path) -> AppResult<Map<String, Value>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(error) => return Err(AppError::Storage(error.to_string())),
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Storage(format!(
            "{} is not a preferences document",
            path.display()
        ))),
    }
}

fn write_document(path: &Path, document: &Map<String, Value>) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(document)?;

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error.into());
    }
    Ok(())
}
