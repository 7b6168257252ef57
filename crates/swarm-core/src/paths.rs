//! Pure path resolution for the store layout. No I/O happens here; callers
//! pass the store root (the `.swarm` directory itself) and get paths back.

use std::path::{Path, PathBuf};

use crate::task::Status;

pub const DEFAULT_STORE_DIR: &str = ".swarm";
pub const SUBTASKS_DIR: &str = "sub-tasks";
pub const TASK_FILE_EXT: &str = "task";

pub fn lockfile(root: &Path) -> PathBuf {
    root.join("lockfile")
}

pub fn version_file(root: &Path) -> PathBuf {
    root.join("version")
}

pub fn statuses_dir(root: &Path) -> PathBuf {
    root.join("statuses")
}

pub fn status_file(root: &Path, status: Status) -> PathBuf {
    statuses_dir(root).join(status.as_str())
}

pub fn tasks_dir(root: &Path) -> PathBuf {
    root.join("tasks")
}

/// Directory holding a task's file and its `sub-tasks/` tree. The id may be
/// fully qualified (`parent/child/...`); each segment nests one level.
/// Empty segments are a caller contract violation.
pub fn task_dir(root: &Path, id: &str) -> PathBuf {
    let mut dir = tasks_dir(root);
    for (depth, segment) in id.split('/').enumerate() {
        debug_assert!(!segment.is_empty(), "empty id segment in {id:?}");
        if depth > 0 {
            dir.push(SUBTASKS_DIR);
        }
        dir.push(segment);
    }
    dir
}

pub fn task_file(root: &Path, id: &str) -> PathBuf {
    let leaf = id.rsplit('/').next().unwrap_or(id);
    task_dir(root, id).join(format!("{leaf}.{TASK_FILE_EXT}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn top_level_task_paths() {
        let root = Path::new("/repo/.swarm");
        assert_eq!(task_dir(root, "abc"), root.join("tasks").join("abc"));
        assert_eq!(
            task_file(root, "abc"),
            root.join("tasks").join("abc").join("abc.task")
        );
    }

    #[test]
    fn subtask_paths_nest_per_segment() {
        let root = Path::new("/repo/.swarm");
        let expected = root
            .join("tasks")
            .join("a")
            .join("sub-tasks")
            .join("b")
            .join("sub-tasks")
            .join("c");
        assert_eq!(task_dir(root, "a/b/c"), expected);
        assert_eq!(task_file(root, "a/b/c"), expected.join("c.task"));
    }

    #[test]
    fn status_file_uses_status_name() {
        let root = Path::new("/repo/.swarm");
        assert_eq!(
            status_file(root, Status::InProgress),
            root.join("statuses").join("in-progress")
        );
    }
}
