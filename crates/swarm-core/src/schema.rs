//! Schema version gate. A single integer at `<root>/version` says which
//! on-disk layout is valid; operations call [`ensure`] before touching the
//! store and migrations run in order until the layout is current. The
//! marker is advanced only after a step completes, so a failed step is
//! re-attempted from the same starting version on retry.

use std::fs;
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::paths;
use crate::status_index::StatusIndex;
use crate::task::Status;

pub const CURRENT_VERSION: u32 = 3;

/// Absent marker means version 0: the store was never initialized.
pub fn read_version(root: &Path) -> Result<u32> {
    let path = paths::version_file(root);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err.into()),
    };
    text.trim().parse::<u32>().map_err(|_| StoreError::Migration {
        version: 0,
        message: format!("unreadable version marker at {}", path.display()),
    })
}

pub fn write_version(root: &Path, version: u32) -> Result<()> {
    fs::create_dir_all(root)?;
    fs::write(paths::version_file(root), format!("{version}\n"))?;
    Ok(())
}

/// Bring the store to the current schema version. Version 0 initializes the
/// current layout directly (nothing to migrate from); older versions run
/// each migration step in order; newer versions fail with
/// `UnsupportedSchema` (no downgrade path).
pub fn ensure(root: &Path) -> Result<()> {
    let found = read_version(root)?;
    if found == CURRENT_VERSION {
        return Ok(());
    }
    if found > CURRENT_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found,
            supported: CURRENT_VERSION,
        });
    }
    if found == 0 {
        init_current_layout(root)?;
        write_version(root, CURRENT_VERSION)?;
        return Ok(());
    }
    for version in (found + 1)..=CURRENT_VERSION {
        log::info!("migrating store {} to schema v{version}", root.display());
        migrate_step(root, version)?;
        write_version(root, version)?;
    }
    Ok(())
}

fn init_current_layout(root: &Path) -> Result<()> {
    fs::create_dir_all(paths::tasks_dir(root))?;
    StatusIndex::new(root).ensure_files()?;
    Ok(())
}

fn migrate_step(root: &Path, target: u32) -> Result<()> {
    match target {
        2 => migrate_v1_to_v2(root),
        3 => migrate_v2_to_v3(root),
        other => Err(StoreError::Migration {
            version: other,
            message: "no migration step defined".to_string(),
        }),
    }
}

/// v1 kept each task directory under a per-status directory
/// (`<root>/open/<id>/`) and had no `draft` status. v2 flattens tasks into
/// `tasks/` and records membership in separate status-index files.
fn migrate_v1_to_v2(root: &Path) -> Result<()> {
    let tasks_dir = paths::tasks_dir(root);
    fs::create_dir_all(&tasks_dir)?;
    let index = StatusIndex::new(root);
    index.ensure_files()?;

    for status in [Status::Open, Status::InProgress, Status::Closed] {
        let old_dir = root.join(status.as_str());
        if !old_dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&old_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            let dest = tasks_dir.join(&id);
            if dest.exists() {
                return Err(StoreError::Migration {
                    version: 2,
                    message: format!("task {id} exists in more than one v1 status directory"),
                });
            }
            fs::rename(entry.path(), &dest)?;
            index.add(&id, status)?;
        }
        // Stray non-directory entries are not migrated; remove them with
        // the directory rather than aborting on an untidy v1 store.
        fs::remove_dir_all(&old_dir)?;
    }
    Ok(())
}

/// v3 only adds the optional `dependsOn` task-file field; structurally it is
/// identical to v2, so this step just validates that the v2 layout is
/// intact.
fn migrate_v2_to_v3(root: &Path) -> Result<()> {
    let mut missing = Vec::new();
    if !paths::tasks_dir(root).is_dir() {
        missing.push("tasks directory".to_string());
    }
    for status in Status::ALL {
        if !paths::status_file(root, status).is_file() {
            missing.push(format!("status index {}", status.as_str()));
        }
    }
    if !missing.is_empty() {
        return Err(StoreError::Migration {
            version: 3,
            message: format!("v2 layout incomplete: {}", missing.join(", ")),
        });
    }
    Ok(())
}
