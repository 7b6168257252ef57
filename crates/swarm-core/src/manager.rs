//! The task manager: the only component that mutates task files and the
//! status index together. Every public operation validates the schema
//! version, makes sure the layout exists, takes the store lock, then runs
//! its body; the lock guard releases on drop whether the body succeeded or
//! not.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config;
use crate::error::{Result, StoreError};
use crate::lock::StoreLock;
use crate::paths;
use crate::schema;
use crate::status_index::StatusIndex;
use crate::task::{self, Status, Task, TaskFile};

/// Options for [`TaskManager::create_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assignee: Option<String>,
    pub parent: Option<String>,
    pub depends_on: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> NewTask {
        NewTask {
            title: title.into(),
            description: description.into(),
            ..NewTask::default()
        }
    }
}

/// Field changes for [`TaskManager::update_task`]. `None` means "leave
/// unchanged"; for the assignee, `Some(None)` means "explicitly clear".
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<Option<String>>,
    pub depends_on: Option<Vec<String>>,
}

/// Store-health diagnostics; never auto-repaired.
#[derive(Debug, Clone)]
pub struct StoreReport {
    pub duplicate_ids: Vec<String>,
    pub dangling_dependencies: Vec<String>,
}

impl StoreReport {
    pub fn is_healthy(&self) -> bool {
        self.duplicate_ids.is_empty() && self.dangling_dependencies.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TaskManager {
    root: PathBuf,
    index: StatusIndex,
}

impl TaskManager {
    /// `store_root` is the store directory itself (typically `<dir>/.swarm`).
    pub fn new(store_root: impl Into<PathBuf>) -> TaskManager {
        let root = store_root.into();
        let index = StatusIndex::new(&root);
        TaskManager { root, index }
    }

    /// Resolve the store root for a working directory (project config,
    /// `SWARM_DIR`, default `.swarm`) and build a manager over it.
    pub fn for_workdir(workdir: &Path) -> TaskManager {
        TaskManager::new(config::resolve_store_root(workdir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the full store layout and stamp the current schema version.
    /// Safe to call on an existing store; an older store is migrated.
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        schema::ensure(&self.root)?;
        fs::create_dir_all(paths::tasks_dir(&self.root))?;
        self.index.ensure_files()?;
        let lockfile = paths::lockfile(&self.root);
        if !lockfile.is_file() {
            fs::write(&lockfile, "")?;
        }
        Ok(())
    }

    /// Structural pieces the store is missing, for first-run guidance.
    /// Empty means the store looks complete.
    pub fn check_initialization(&self) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        if !self.root.is_dir() {
            missing.push("store directory".to_string());
        }
        if !paths::version_file(&self.root).is_file() {
            missing.push("version marker".to_string());
        }
        if !paths::lockfile(&self.root).is_file() {
            missing.push("lockfile".to_string());
        }
        if !paths::tasks_dir(&self.root).is_dir() {
            missing.push("tasks directory".to_string());
        }
        for status in Status::ALL {
            if !paths::status_file(&self.root, status).is_file() {
                missing.push(format!("status index {}", status.as_str()));
            }
        }
        Ok(missing)
    }

    pub fn create_task(&self, new: NewTask) -> Result<Task> {
        if new.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty".to_string()));
        }
        let _lock = self.prepare()?;

        let token = task::generate_id();
        let (id, status) = match &new.parent {
            Some(parent) => {
                validate_id(parent)?;
                if !paths::task_file(&self.root, parent).is_file() {
                    return Err(StoreError::InvalidInput(format!(
                        "parent task {parent} not found"
                    )));
                }
                // Subtasks always start open; only top-level tasks promote
                // to in-progress from an assignee at creation.
                (format!("{parent}/{token}"), Status::Open)
            }
            None => {
                let status = if new.assignee.is_some() {
                    Status::InProgress
                } else {
                    Status::Open
                };
                (token, status)
            }
        };

        let file = TaskFile {
            title: new.title,
            assignee: new.assignee,
            depends_on: new.depends_on,
            description: new.description,
        };
        fs::create_dir_all(paths::task_dir(&self.root, &id))?;
        task::write_task_file(&paths::task_file(&self.root, &id), &file)?;
        self.index.add(&id, status)?;
        log::info!("created task {id} ({status})");
        Ok(Task::from_file(id, status, file))
    }

    /// `None` when the task file does not exist, and also when the file
    /// exists but no status index entry is found: a task without an index
    /// entry is not considered retrievable.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        self.load_task(id)
    }

    /// All tasks in the given status, or in all four statuses. Output order
    /// follows the sorted index files, so it is stable for a fixed store
    /// state. A malformed task file aborts the whole listing.
    pub fn list_tasks(&self, filter: Option<Status>) -> Result<Vec<Task>> {
        let _lock = self.prepare()?;
        self.collect_tasks(filter)
    }

    /// Live task-list view: the first [`TaskWatcher::next_list`] yields
    /// immediately, later calls block until a relevant status-index file
    /// changes. Dropping the watcher is the teardown.
    pub fn watch_tasks(&self, filter: Option<Status>) -> TaskWatcher<'_> {
        TaskWatcher {
            manager: self,
            filter,
            poll_interval: Duration::from_millis(250),
            last_stamp: None,
        }
    }

    pub fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        let Some(mut task) = self.load_task(id)? else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(StoreError::InvalidInput("title must not be empty".to_string()));
            }
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(depends_on) = update.depends_on {
            for dep in &depends_on {
                if self.creates_cycle(id, dep)? {
                    return Err(StoreError::CircularDependency {
                        task: id.to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
            task.depends_on = depends_on;
            task.depends_on.sort();
            task.depends_on.dedup();
        }

        let mut new_status = task.status;
        if let Some(assignee) = update.assignee {
            let top_level = task.is_top_level();
            match assignee {
                Some(assignee) => {
                    task.assignee = Some(assignee);
                    if top_level && task.status == Status::Open {
                        new_status = Status::InProgress;
                    }
                }
                None => {
                    task.assignee = None;
                    if top_level
                        && matches!(task.status, Status::InProgress | Status::Closed)
                    {
                        new_status = Status::Open;
                    }
                }
            }
        }

        // Index move first: on a crash between the two writes the index, not
        // the file, is ground truth for whether the change landed.
        if new_status != task.status {
            self.index.move_entry(id, Some(task.status), new_status)?;
            task.status = new_status;
        }
        task::write_task_file(&paths::task_file(&self.root, id), &task.to_file())?;
        Ok(Some(task))
    }

    pub fn change_status(&self, id: &str, new_status: Status) -> Result<Option<Task>> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        let Some(mut task) = self.load_task(id)? else {
            return Ok(None);
        };
        if task.status == new_status {
            return Ok(Some(task));
        }
        self.index.move_entry(id, Some(task.status), new_status)?;
        task.status = new_status;
        log::info!("task {id} -> {new_status}");
        Ok(Some(task))
    }

    pub fn assign(&self, id: &str, assignee: impl Into<String>) -> Result<Option<Task>> {
        self.update_task(
            id,
            TaskUpdate {
                assignee: Some(Some(assignee.into())),
                ..TaskUpdate::default()
            },
        )
    }

    pub fn unassign(&self, id: &str) -> Result<Option<Task>> {
        self.update_task(
            id,
            TaskUpdate {
                assignee: Some(None),
                ..TaskUpdate::default()
            },
        )
    }

    /// Remove a task, its files and its index entry. Deletion cascades to
    /// every descendant subtask; index entries go first so the index never
    /// references a path that is about to vanish.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        let dir = paths::task_dir(&self.root, id);

        if id.contains('/') {
            if !paths::task_file(&self.root, id).is_file() {
                return Ok(false);
            }
        } else if !dir.is_dir() {
            return Ok(false);
        }

        // A subtask can carry its own subtree, so the cascade is the same
        // either way: clear every descendant's index entry, then the
        // task's own, then remove the directory.
        let descendants = self.collect_descendants(id)?;
        if let Some(status) = self.index.find_status(id)? {
            self.index.remove(id, status)?;
        }
        for descendant in &descendants {
            if let Some(status) = self.index.find_status(descendant)? {
                self.index.remove(descendant, status)?;
            }
        }
        fs::remove_dir_all(&dir)?;
        log::info!("deleted task {id} and {} subtask(s)", descendants.len());
        Ok(true)
    }

    /// Append a dependency after verifying it introduces no cycle; the
    /// check runs before any mutation, so rejection leaves the store
    /// unchanged.
    pub fn add_dependency(&self, id: &str, dep_id: &str) -> Result<Option<Task>> {
        validate_id(id)?;
        validate_id(dep_id)?;
        let _lock = self.prepare()?;
        let Some(mut task) = self.load_task(id)? else {
            return Ok(None);
        };
        if self.load_task(dep_id)?.is_none() {
            return Err(StoreError::InvalidInput(format!(
                "dependency task {dep_id} not found"
            )));
        }
        if self.creates_cycle(id, dep_id)? {
            return Err(StoreError::CircularDependency {
                task: id.to_string(),
                dependency: dep_id.to_string(),
            });
        }
        if task.depends_on.iter().any(|dep| dep == dep_id) {
            return Ok(Some(task));
        }
        task.depends_on.push(dep_id.to_string());
        task.depends_on.sort();
        task::write_task_file(&paths::task_file(&self.root, id), &task.to_file())?;
        Ok(Some(task))
    }

    pub fn remove_dependency(&self, id: &str, dep_id: &str) -> Result<Option<Task>> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        let Some(mut task) = self.load_task(id)? else {
            return Ok(None);
        };
        task.depends_on.retain(|dep| dep != dep_id);
        task::write_task_file(&paths::task_file(&self.root, id), &task.to_file())?;
        Ok(Some(task))
    }

    /// Resolved `Task` objects for each entry in the task's `dependsOn`.
    /// Dangling entries are skipped; the `validate` sweep reports them.
    pub fn dependencies(&self, id: &str) -> Result<Option<Vec<Task>>> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        let Some(task) = self.load_task(id)? else {
            return Ok(None);
        };
        let mut resolved = Vec::new();
        for dep in &task.depends_on {
            if let Some(dep_task) = self.load_task(dep)? {
                resolved.push(dep_task);
            }
        }
        Ok(Some(resolved))
    }

    /// Reverse scan over all tasks for any whose `dependsOn` names `id`.
    pub fn dependents(&self, id: &str) -> Result<Vec<Task>> {
        validate_id(id)?;
        let _lock = self.prepare()?;
        let tasks = self.collect_tasks(None)?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.depends_on.iter().any(|dep| dep == id))
            .collect())
    }

    /// Diagnostic sweep: duplicate index entries and dangling dependencies.
    pub fn validate(&self) -> Result<StoreReport> {
        let _lock = self.prepare()?;
        let duplicate_ids = self.index.validate_no_duplicates()?;
        let tasks = self.collect_tasks(None)?;
        let known: HashSet<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
        let mut dangling = Vec::new();
        for task in &tasks {
            for dep in &task.depends_on {
                if !known.contains(dep.as_str()) {
                    dangling.push(format!("{} -> {dep}", task.id));
                }
            }
        }
        Ok(StoreReport {
            duplicate_ids,
            dangling_dependencies: dangling,
        })
    }

    /// Schema gate, layout check, then the store lock. Order matters: the
    /// gate may rewrite the layout and must finish before the operation
    /// body observes it.
    fn prepare(&self) -> Result<StoreLock> {
        if !self.root.is_dir() {
            return Err(StoreError::NotInitialized {
                missing: self.check_initialization()?,
            });
        }
        schema::ensure(&self.root)?;
        fs::create_dir_all(paths::tasks_dir(&self.root))?;
        self.index.ensure_files()?;
        StoreLock::acquire(&paths::lockfile(&self.root))
    }

    fn load_task(&self, id: &str) -> Result<Option<Task>> {
        let path = paths::task_file(&self.root, id);
        if !path.is_file() {
            return Ok(None);
        }
        let Some(status) = self.index.find_status(id)? else {
            return Ok(None);
        };
        let file = task::read_task_file(&path)?;
        Ok(Some(Task::from_file(id.to_string(), status, file)))
    }

    fn collect_tasks(&self, filter: Option<Status>) -> Result<Vec<Task>> {
        let statuses: Vec<Status> = match filter {
            Some(status) => vec![status],
            None => Status::ALL.to_vec(),
        };
        let mut tasks = Vec::new();
        for status in statuses {
            for id in self.index.read(status)? {
                let path = paths::task_file(&self.root, &id);
                let file = task::read_task_file(&path)?;
                tasks.push(Task::from_file(id, status, file));
            }
        }
        Ok(tasks)
    }

    /// Fully-qualified ids of every descendant subtask, via the on-disk
    /// `sub-tasks/` tree.
    fn collect_descendants(&self, id: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            let sub_dir = paths::task_dir(&self.root, &current).join(paths::SUBTASKS_DIR);
            if !sub_dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&sub_dir)? {
                let entry = entry?;
                if entry.path().is_dir() {
                    let child =
                        format!("{current}/{}", entry.file_name().to_string_lossy());
                    out.push(child.clone());
                    stack.push(child);
                }
            }
        }
        Ok(out)
    }

    /// Walk the dependency graph from `dep_id` looking for a path back to
    /// `task_id`. Dangling entries terminate their branch.
    fn creates_cycle(&self, task_id: &str, dep_id: &str) -> Result<bool> {
        if task_id == dep_id {
            return Ok(true);
        }
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![dep_id.to_string()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(task) = self.load_task(&current)? else {
                continue;
            };
            for dep in task.depends_on {
                if dep == task_id {
                    return Ok(true);
                }
                stack.push(dep);
            }
        }
        Ok(false)
    }
}

/// Blocking, cooperatively-suspending task-list stream over a polled watch
/// of the status-index files. No yields happen after the watcher is
/// dropped, and polling holds no lock; the lock is taken only while a fresh
/// list is collected.
#[derive(Debug)]
pub struct TaskWatcher<'a> {
    manager: &'a TaskManager,
    filter: Option<Status>,
    poll_interval: Duration,
    last_stamp: Option<Vec<i64>>,
}

impl TaskWatcher<'_> {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Current filtered list; the first call returns immediately, later
    /// calls block until a relevant status-index file's mtime changes.
    pub fn next_list(&mut self) -> Result<Vec<Task>> {
        if let Some(last) = self.last_stamp.clone() {
            loop {
                if self.stamp() != last {
                    break;
                }
                std::thread::sleep(self.poll_interval);
            }
        }
        let _lock = self.manager.prepare()?;
        let tasks = self.manager.collect_tasks(self.filter)?;
        self.last_stamp = Some(self.stamp());
        Ok(tasks)
    }

    fn statuses(&self) -> Vec<Status> {
        match self.filter {
            Some(status) => vec![status],
            None => Status::ALL.to_vec(),
        }
    }

    fn stamp(&self) -> Vec<i64> {
        self.statuses()
            .iter()
            .map(|status| file_mtime_nanos(&paths::status_file(&self.manager.root, *status)))
            .collect()
    }
}

impl Iterator for TaskWatcher<'_> {
    type Item = Result<Vec<Task>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_list())
    }
}

fn file_mtime_nanos(path: &Path) -> i64 {
    let Ok(metadata) = fs::metadata(path) else {
        return 0;
    };
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    modified
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos() as i64)
        .unwrap_or(0)
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.split('/').any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidInput(format!("malformed task id {id:?}")));
    }
    Ok(())
}
