use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::paths;

pub const CONFIG_FILENAME: &str = ".swarm.toml";
pub const STORE_DIR_ENV: &str = "SWARM_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Store directory name (or path) relative to the working directory.
    pub root_dir: Option<String>,
}

pub fn config_path(workdir: &Path) -> PathBuf {
    workdir.join(CONFIG_FILENAME)
}

pub fn load_config(workdir: &Path) -> Option<SwarmConfig> {
    let path = config_path(workdir);
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(&path).ok()?;
    toml::from_str::<SwarmConfig>(&text).ok()
}

/// Store root for a working directory: project config first, then the
/// `SWARM_DIR` environment variable, then the default `.swarm`.
pub fn resolve_store_root(workdir: &Path) -> PathBuf {
    if let Some(root_dir) = load_config(workdir).and_then(|config| config.root_dir) {
        let trimmed = root_dir.trim();
        if !trimmed.is_empty() {
            return workdir.join(trimmed);
        }
    }
    if let Ok(value) = std::env::var(STORE_DIR_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return workdir.join(trimmed);
        }
    }
    workdir.join(paths::DEFAULT_STORE_DIR)
}
