use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by store operations. Expected outcomes ("task not
/// found") are modeled as `Ok(None)` / `Ok(false)` by the manager, not as
/// variants here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not initialized; missing: {}", missing.join(", "))]
    NotInitialized { missing: Vec<String> },
    #[error("malformed task file (no front matter delimiter): {0}")]
    MalformedTaskFile(PathBuf),
    #[error("adding dependency {dependency} to {task} would create a cycle")]
    CircularDependency { task: String, dependency: String },
    #[error("store schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("could not acquire store lock: {0}")]
    LockTimeout(PathBuf),
    #[error("migration to schema version {version} failed: {message}")]
    Migration { version: u32, message: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
