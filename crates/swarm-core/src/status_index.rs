//! Durable set membership per status: one newline-separated file of sorted
//! task ids per lifecycle status. Callers hold the store lock; this module
//! only guarantees that individual index files are never observed
//! half-written (temp file + rename in the same directory).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::paths;
use crate::task::Status;

#[derive(Debug, Clone)]
pub struct StatusIndex {
    root: PathBuf,
}

impl StatusIndex {
    pub fn new(root: impl Into<PathBuf>) -> StatusIndex {
        StatusIndex { root: root.into() }
    }

    /// Ids currently in `status`, sorted. A missing index file means the
    /// status is empty, not an error.
    pub fn read(&self, status: Status) -> Result<Vec<String>> {
        let path = paths::status_file(&self.root, status);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Persist `ids` (sorted lexicographically) for `status`. Content goes
    /// to a temp file in the same directory first, then renames over the
    /// target, so a crash mid-write leaves the old content intact.
    pub fn write(&self, status: Status, ids: &[String]) -> Result<()> {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        let mut content = String::new();
        for id in sorted {
            content.push_str(id);
            content.push('\n');
        }

        let path = paths::status_file(&self.root, status);
        let dir = paths::statuses_dir(&self.root);
        fs::create_dir_all(&dir)?;
        let tmp = dir.join(format!(".{}.tmp", status.as_str()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Idempotent; false when the id was already present.
    pub fn add(&self, id: &str, status: Status) -> Result<bool> {
        let mut ids = self.read(status)?;
        if ids.iter().any(|existing| existing == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.write(status, &ids)?;
        log::debug!("index add {id} -> {status}");
        Ok(true)
    }

    /// False when the id was not present.
    pub fn remove(&self, id: &str, status: Status) -> Result<bool> {
        let mut ids = self.read(status)?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.write(status, &ids)?;
        log::debug!("index remove {id} <- {status}");
        Ok(true)
    }

    /// Remove-then-add. `from` is a hint; when absent (or wrong) the entry
    /// is looked up across all statuses before being re-added under `to`.
    pub fn move_entry(&self, id: &str, from: Option<Status>, to: Status) -> Result<()> {
        let removed = match from {
            Some(from) => self.remove(id, from)?,
            None => false,
        };
        if !removed {
            if let Some(actual) = self.find_status(id)? {
                self.remove(id, actual)?;
            }
        }
        self.add(id, to)?;
        Ok(())
    }

    /// Linear scan over all four status files. Index files are small text
    /// lists, so this stays off any performance-critical path by design.
    pub fn find_status(&self, id: &str) -> Result<Option<Status>> {
        for status in Status::ALL {
            if self.read(status)?.iter().any(|existing| existing == id) {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    /// Idempotent setup: the statuses directory with one (possibly empty)
    /// file per status.
    pub fn ensure_files(&self) -> Result<()> {
        fs::create_dir_all(paths::statuses_dir(&self.root))?;
        for status in Status::ALL {
            let path = paths::status_file(&self.root, status);
            if !path.is_file() {
                self.write(status, &[])?;
            }
        }
        Ok(())
    }

    /// Diagnostic sweep for the single-status invariant: ids that appear in
    /// more than one index file.
    pub fn validate_no_duplicates(&self) -> Result<Vec<String>> {
        let mut seen: Vec<String> = Vec::new();
        let mut duplicates: Vec<String> = Vec::new();
        for status in Status::ALL {
            for id in self.read(status)? {
                if seen.contains(&id) {
                    if !duplicates.contains(&id) {
                        duplicates.push(id);
                    }
                } else {
                    seen.push(id);
                }
            }
        }
        duplicates.sort();
        Ok(duplicates)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
