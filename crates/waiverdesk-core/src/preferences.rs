//! Local key-value persistence for dashboard preferences.
//!
//! Callers go through [`Preferences`], which knows the keys and value
//! formats; the backing [`PreferenceStore`] only moves strings around and can
//! be swapped (in-memory for tests, a JSON file for the CLI) without touching
//! call sites.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ACTIVE_MODULE_KEY: &str = "activeModule";
pub const AUTH_TOKEN_KEY: &str = "authToken";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preference file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("preference file {path} is not a JSON object of strings: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("preference store lock poisoned")]
    Poisoned,
}

/// String key-value storage.
pub trait PreferenceStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;

    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), PreferenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let entries = self.entries.read().map_err(|_| PreferenceError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut entries = self.entries.write().map_err(|_| PreferenceError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut entries = self.entries.write().map_err(|_| PreferenceError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Preferences persisted as a flat JSON object in a single file.
///
/// Every write rewrites the whole file. A missing file reads as empty.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> PreferenceError {
        PreferenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| PreferenceError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let body = serde_json::to_string_pretty(entries).map_err(|source| PreferenceError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, body).map_err(|e| self.io_err(e))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let _guard = self.lock.read().map_err(|_| PreferenceError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self.lock.write().map_err(|_| PreferenceError::Poisoned)?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let _guard = self.lock.write().map_err(|_| PreferenceError::Poisoned)?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Sidebar module shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardModule {
    #[default]
    DutyWaiver,
    Aeo,
}

impl DashboardModule {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DashboardModule::DutyWaiver => "duty_waiver",
            DashboardModule::Aeo => "aeo",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "duty_waiver" => Some(DashboardModule::DutyWaiver),
            "aeo" => Some(DashboardModule::Aeo),
            _ => None,
        }
    }
}

impl std::fmt::Display for DashboardModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed access to the dashboard's persisted preferences.
pub struct Preferences<S> {
    store: S,
}

impl<S: PreferenceStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Active module; unknown or missing values read as the default module.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the store cannot be read.
    pub fn active_module(&self) -> Result<DashboardModule, PreferenceError> {
        Ok(self
            .store
            .get(ACTIVE_MODULE_KEY)?
            .as_deref()
            .and_then(DashboardModule::parse)
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the store cannot be written.
    pub fn set_active_module(&self, module: DashboardModule) -> Result<(), PreferenceError> {
        self.store.set(ACTIVE_MODULE_KEY, module.as_str())
    }

    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the store cannot be read.
    pub fn auth_token(&self) -> Result<Option<String>, PreferenceError> {
        Ok(self
            .store
            .get(AUTH_TOKEN_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }

    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the store cannot be written.
    pub fn set_auth_token(&self, token: &str) -> Result<(), PreferenceError> {
        self.store.set(AUTH_TOKEN_KEY, token.trim())
    }

    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the store cannot be written.
    pub fn clear_auth_token(&self) -> Result<(), PreferenceError> {
        self.store.remove(AUTH_TOKEN_KEY)
    }
}
