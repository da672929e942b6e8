//! Configuration store: the live rule list and its JSON persistence

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::constants::config;
use crate::errors::EngineError;

use super::rules::{Document, GlobalDefaults, MatchRule, RuleCell, RuleHandle, RuleId};

/// Shared by the monitor thread and the UI thread
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    defaults: GlobalDefaults,
    rules: RwLock<Vec<RuleHandle>>,
    next_id: AtomicU64,
    dirty: AtomicBool,
    save_lock: Mutex<()>,
}

impl ConfigStore {
    /// Default location: `<config dir>/livepane/config.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load the document at `path`, writing a default one if none exists
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, creating default config");
            let document = Document {
                windows: Vec::new(),
                defaults: GlobalDefaults::builtin(),
            };
            let store = Self::from_document(path, document);
            store.save()?;
            return Ok(store);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let document: Document = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;

        info!(
            path = %path.display(),
            rules = document.windows.len(),
            "Loaded configuration"
        );
        Ok(Self::from_document(path, document))
    }

    pub fn from_document(path: PathBuf, document: Document) -> Self {
        let store = Self {
            path,
            defaults: document.defaults,
            rules: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            dirty: AtomicBool::new(false),
            save_lock: Mutex::new(()),
        };
        let handles = document
            .windows
            .into_iter()
            .map(|rule| store.mint(rule))
            .collect();
        *store.rules.write().unwrap_or_else(PoisonError::into_inner) = handles;
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &GlobalDefaults {
        &self.defaults
    }

    /// Snapshot of the handles in document order
    pub fn rules(&self) -> Vec<RuleHandle> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wrap a rule in a fresh cell without adding it to the list
    pub fn mint(&self, rule: MatchRule) -> RuleHandle {
        let id = RuleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Arc::new(RuleCell::new(id, rule))
    }

    pub fn append(&self, handles: impl IntoIterator<Item = RuleHandle>) {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let before = rules.len();
        rules.extend(handles);
        if rules.len() != before {
            self.mark_dirty();
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn document(&self) -> Document {
        Document {
            windows: self.rules().iter().map(|rule| rule.snapshot()).collect(),
            defaults: self.defaults.clone(),
        }
    }

    /// Write the document; on failure the store stays dirty
    pub fn save(&self) -> Result<(), EngineError> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Cleared first so mutations racing this save keep the store dirty
        self.dirty.store(false, Ordering::SeqCst);
        let result = self.write_to(&self.path);
        if result.is_err() {
            self.mark_dirty();
        } else {
            debug!(path = %self.path.display(), "Saved configuration");
        }
        result
    }

    /// Write a copy to the first free `<path>.backup<N>`
    pub fn backup(&self) -> Result<PathBuf, EngineError> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let target = next_backup_path(&self.path);
        self.write_to(&target)?;
        info!(path = %target.display(), "Wrote configuration backup");
        Ok(target)
    }

    fn write_to(&self, path: &Path) -> Result<(), EngineError> {
        let persistence = |source| EngineError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(persistence)?;
        }

        let json = serde_json::to_string_pretty(&self.document())
            .map_err(|e| persistence(std::io::Error::other(e)))?;
        fs::write(path, json).map_err(persistence)
    }
}

fn next_backup_path(path: &Path) -> PathBuf {
    let mut n = 1u32;
    loop {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(format!("{}{}", config::BACKUP_SUFFIX, n));
        let candidate = PathBuf::from(candidate);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
