//! Storage configuration and path management for lintgate.
//!
//! All persistent state lives under one root directory:
//!
//! ```text
//! $XDG_CONFIG_HOME/lintgate/     (or ~/.config/lintgate/)
//! ├── config.json                timeout, cooldown, package manager
//! ├── skip-registry.json         per-directory skipped kinds
//! └── logs/lintgate.log.<date>   daily rolling log
//! ```
//!
//! Lock files are not here: they live in the system temp directory so that
//! every user and sandbox on the machine agrees on one location.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "lintgate";

/// Central configuration for lintgate storage paths.
///
/// Production code uses `StorageConfig::default()`. Tests use
/// `StorageConfig::with_root(temp_dir)` for isolation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: config_home().join(APP_DIR),
        }
    }
}

fn config_home() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .unwrap_or_else(std::env::temp_dir)
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.json (timeouts and preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to skip-registry.json.
    pub fn skip_registry_file(&self) -> PathBuf {
        self.root.join("skip-registry.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
