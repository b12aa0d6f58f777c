//! Persistence seam for inspections.
//!
//! Backends only move the aggregate in and out; nothing derived (grade,
//! statistics) is written. [`FallbackBackend`] composes a primary and a
//! fallback backend with an explicit one-way switch instead of a hidden
//! global flag.

use crate::{
    error::{GradeError, GradeResult},
    model::Inspection,
    util::ensure_dir,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub trait PersistenceBackend: Send + Sync {
    fn name(&self) -> &str;
    fn save(&self, inspection: &Inspection) -> GradeResult<()>;
    fn load(&self, id: &str) -> GradeResult<Inspection>;
    /// All stored inspections, ordered by id.
    fn list(&self) -> GradeResult<Vec<Inspection>>;
    fn delete(&self, id: &str) -> GradeResult<()>;
}

fn check_id(id: &str) -> GradeResult<()> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(GradeError::InvalidInput(format!("unsupported inspection id: {id:?}")))
    }
}

/// One pretty-printed JSON file per inspection under `root`.
pub struct DirBackend {
    name: String,
    root: PathBuf,
}

impl DirBackend {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> GradeResult<PathBuf> {
        check_id(id)?;
        Ok(self.root.join(format!("{id}.json")))
    }

    fn storage_err(&self, what: &str, err: impl std::fmt::Display) -> GradeError {
        GradeError::Storage(format!("{} {what}: {err}", self.name))
    }
}

impl PersistenceBackend for DirBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn save(&self, inspection: &Inspection) -> GradeResult<()> {
        let path = self.path_for(&inspection.id)?;
        ensure_dir(&self.root).map_err(|e| self.storage_err("create dir", format!("{e:#}")))?;
        let raw = serde_json::to_string_pretty(inspection)
            .map_err(|e| GradeError::InvalidInput(format!("serialize inspection: {e}")))?;

        // write-then-rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(|e| self.storage_err("write", e))?;
        std::fs::rename(&tmp, &path).map_err(|e| self.storage_err("rename", e))?;
        debug!("{} saved {}", self.name, path.display());
        Ok(())
    }

    fn load(&self, id: &str) -> GradeResult<Inspection> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(GradeError::NotFound(format!("inspection {id}")));
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| self.storage_err("read", e))?;
        serde_json::from_str(&raw)
            .map_err(|e| GradeError::InvalidInput(format!("{}: {e}", path.display())))
    }

    fn list(&self) -> GradeResult<Vec<Inspection>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| self.storage_err("read dir", e))?;
        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.storage_err("read dir", e))?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(id) {
                Ok(insp) => out.push(insp),
                Err(GradeError::InvalidInput(msg)) => warn!("{} skipping unreadable record: {msg}", self.name),
                Err(e) => return Err(e),
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn delete(&self, id: &str) -> GradeResult<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(GradeError::NotFound(format!("inspection {id}")));
        }
        std::fs::remove_file(&path).map_err(|e| self.storage_err("remove", e))
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<BTreeMap<String, Inspection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut BTreeMap<String, Inspection>) -> GradeResult<T>) -> GradeResult<T> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| GradeError::Storage("memory store lock poisoned".into()))?;
        f(&mut guard)
    }
}

impl PersistenceBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn save(&self, inspection: &Inspection) -> GradeResult<()> {
        check_id(&inspection.id)?;
        self.with_records(|r| {
            r.insert(inspection.id.clone(), inspection.clone());
            Ok(())
        })
    }

    fn load(&self, id: &str) -> GradeResult<Inspection> {
        self.with_records(|r| {
            r.get(id)
                .cloned()
                .ok_or_else(|| GradeError::NotFound(format!("inspection {id}")))
        })
    }

    fn list(&self) -> GradeResult<Vec<Inspection>> {
        self.with_records(|r| Ok(r.values().cloned().collect()))
    }

    fn delete(&self, id: &str) -> GradeResult<()> {
        self.with_records(|r| {
            r.remove(id)
                .map(|_| ())
                .ok_or_else(|| GradeError::NotFound(format!("inspection {id}")))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    Primary,
    Fallback,
}

/// Routes to `primary` until it reports a storage failure, then switches
/// to `fallback` for the rest of its lifetime. Not-found and invalid-input
/// errors pass through without switching.
pub struct FallbackBackend {
    primary: Box<dyn PersistenceBackend>,
    fallback: Box<dyn PersistenceBackend>,
    on_fallback: AtomicBool,
}

impl FallbackBackend {
    pub fn new(primary: Box<dyn PersistenceBackend>, fallback: Box<dyn PersistenceBackend>) -> Self {
        Self {
            primary,
            fallback,
            on_fallback: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> BackendState {
        if self.on_fallback.load(Ordering::Acquire) {
            BackendState::Fallback
        } else {
            BackendState::Primary
        }
    }

    fn route<T>(&self, op: &str, f: impl Fn(&dyn PersistenceBackend) -> GradeResult<T>) -> GradeResult<T> {
        if self.state() == BackendState::Fallback {
            return f(self.fallback.as_ref());
        }
        match f(self.primary.as_ref()) {
            Err(GradeError::Storage(msg)) => {
                if self
                    .on_fallback
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    warn!(
                        "{} failed during {op} ({msg}); switching to {}",
                        self.primary.name(),
                        self.fallback.name()
                    );
                }
                f(self.fallback.as_ref())
            }
            other => other,
        }
    }
}

impl PersistenceBackend for FallbackBackend {
    fn name(&self) -> &str {
        match self.state() {
            BackendState::Primary => self.primary.name(),
            BackendState::Fallback => self.fallback.name(),
        }
    }

    fn save(&self, inspection: &Inspection) -> GradeResult<()> {
        self.route("save", |b| b.save(inspection))
    }

    fn load(&self, id: &str) -> GradeResult<Inspection> {
        self.route("load", |b| b.load(id))
    }

    fn list(&self) -> GradeResult<Vec<Inspection>> {
        self.route("list", |b| b.list())
    }

    fn delete(&self, id: &str) -> GradeResult<()> {
        self.route("delete", |b| b.delete(id))
    }
}
