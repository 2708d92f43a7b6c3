//! Persisted identifier list with load-or-default semantics.
//!
//! The backing file is a JSON array of integers. A missing or unparseable
//! file is replaced by the seed list. Every change is written to a temp file
//! and renamed over the original while the write guard is held, so readers
//! of the file only ever see a complete snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Outcome of adding several identifiers at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<i64>,
    pub already_present: Vec<i64>,
    pub invalid: Vec<String>,
}

/// Outcome of removing several identifiers at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    pub removed: Vec<i64>,
    pub not_present: Vec<i64>,
    pub invalid: Vec<String>,
}

/// Removal would leave a list that must stay non-empty with no entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WouldEmpty;

/// Ordered, de-duplicated list of identifiers backed by a file.
#[derive(Debug, Clone)]
pub struct ListStore {
    entries: Arc<RwLock<Vec<i64>>>,
    path: PathBuf,
    label: &'static str,
    keep_non_empty: bool,
}

impl ListStore {
    /// Load `path`, reseeding from `seed` when the file is missing, corrupt,
    /// or (for lists that must stay non-empty) empty.
    pub async fn load_or_seed(
        path: PathBuf,
        seed: &[i64],
        label: &'static str,
        keep_non_empty: bool,
    ) -> Self {
        let loaded = match read_entries(&path).await {
            Ok(Some(entries)) if !(keep_non_empty && entries.is_empty()) => Some(entries),
            Ok(Some(_)) => {
                warn!(list = label, path = %path.display(), "List file is empty, reseeding");
                None
            }
            Ok(None) => {
                info!(list = label, path = %path.display(), "No list file, seeding defaults");
                None
            }
            Err(reason) => {
                warn!(list = label, path = %path.display(), %reason, "Discarding corrupt list file");
                None
            }
        };

        let reseed = loaded.is_none();
        let store = Self {
            entries: Arc::new(RwLock::new(dedup(loaded.unwrap_or_else(|| seed.to_vec())))),
            path,
            label,
            keep_non_empty,
        };

        if reseed {
            let entries = store.entries.read().await;
            store.persist(&entries).await;
        }
        store
    }

    pub async fn snapshot(&self) -> Vec<i64> {
        self.entries.read().await.clone()
    }

    pub async fn contains(&self, id: i64) -> bool {
        self.entries.read().await.contains(&id)
    }

    pub async fn first(&self) -> Option<i64> {
        self.entries.read().await.first().copied()
    }

    /// Parse and append each argument, reporting added / present / invalid.
    pub async fn add_many(&self, args: &[String]) -> AddReport {
        let mut entries = self.entries.write().await;
        let mut report = AddReport::default();

        for arg in args {
            match arg.trim().parse::<i64>() {
                Ok(id) if entries.contains(&id) => report.already_present.push(id),
                Ok(id) => {
                    entries.push(id);
                    report.added.push(id);
                }
                Err(_) => report.invalid.push(arg.clone()),
            }
        }

        if !report.added.is_empty() {
            info!(list = self.label, added = ?report.added, "List entries added");
            self.persist(&entries).await;
        }
        report
    }

    /// Parse and remove each argument.
    ///
    /// For lists that must stay non-empty, a removal that would empty the
    /// list is refused as a whole and nothing changes.
    pub async fn remove_many(&self, args: &[String]) -> Result<RemoveReport, WouldEmpty> {
        let mut entries = self.entries.write().await;
        let mut remaining = entries.clone();
        let mut report = RemoveReport::default();

        for arg in args {
            match arg.trim().parse::<i64>() {
                Ok(id) => match remaining.iter().position(|e| *e == id) {
                    Some(pos) => {
                        remaining.remove(pos);
                        report.removed.push(id);
                    }
                    None => report.not_present.push(id),
                },
                Err(_) => report.invalid.push(arg.clone()),
            }
        }

        if self.keep_non_empty && remaining.is_empty() && !report.removed.is_empty() {
            return Err(WouldEmpty);
        }

        if !report.removed.is_empty() {
            *entries = remaining;
            info!(list = self.label, removed = ?report.removed, "List entries removed");
            self.persist(&entries).await;
        }
        Ok(report)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot-and-replace write. Failures are logged and the in-memory
    /// list stays authoritative.
    async fn persist(&self, entries: &[i64]) {
        let content = match serde_json::to_string(entries) {
            Ok(content) => content,
            Err(e) => {
                error!(list = self.label, error = %e, "Failed to serialize list");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!(list = self.label, error = %e, "Failed to create list directory");
                return;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        if let Err(e) = fs::write(&temp_path, content).await {
            error!(list = self.label, path = %temp_path.display(), error = %e, "Failed to write list");
            return;
        }
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            error!(list = self.label, path = %self.path.display(), error = %e, "Failed to replace list");
            return;
        }
        debug!(list = self.label, count = entries.len(), "List persisted");
    }
}

/// `Ok(None)` when the file does not exist, `Err` when it cannot be used.
async fn read_entries(path: &Path) -> Result<Option<Vec<i64>>, String> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("read: {}", e)),
    };

    let content = content.trim();
    if content.is_empty() {
        return Err("file is empty".to_string());
    }

    serde_json::from_str::<Vec<i64>>(content)
        .map(Some)
        .map_err(|e| format!("parse: {}", e))
}

fn dedup(entries: Vec<i64>) -> Vec<i64> {
    let mut seen = Vec::with_capacity(entries.len());
    for id in entries {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
