//! Effect settings persistence
//!
//! The session treats persisted settings as opaque state: it reads them on
//! every graph rebuild and writes them after every setter.

use crate::error::{PlaybackError, Result};
use riff_audio::EffectSettings;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Key-value persistence for effect settings
pub trait SettingsStore: Send + Sync {
    /// Load persisted settings (`None` when nothing was saved yet)
    fn load(&self) -> Result<Option<EffectSettings>>;

    /// Persist settings
    fn save(&self, settings: &EffectSettings) -> Result<()>;
}

/// Settings kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Option<EffectSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `settings`
    pub fn with_settings(settings: EffectSettings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<EffectSettings>> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, settings: &EffectSettings) -> Result<()> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }
}

/// Settings stored as a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Option<EffectSettings>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| PlaybackError::Settings(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, settings: &EffectSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json).map_err(|e| PlaybackError::Write(e.to_string()))
    }
}
