//! Core engine for the swarm issue tracker: a file-backed task store kept
//! under a hidden directory, with per-status index files, an advisory
//! cross-process lock and a schema version gate.

pub mod config;
pub mod error;
pub mod lock;
pub mod manager;
pub mod paths;
pub mod schema;
pub mod status_index;
pub mod task;

pub use error::{Result, StoreError};
pub use manager::{NewTask, StoreReport, TaskManager, TaskUpdate, TaskWatcher};
pub use task::{Status, Task};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
