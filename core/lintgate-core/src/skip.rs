//! Per-directory skip registry.
//!
//! `skip-registry.json` maps an absolute project directory to the kinds that
//! should not run there:
//!
//! ```json
//! { "/home/me/legacy-app": ["lint"], "/home/me/slow-suite": ["lint", "test"] }
//! ```
//!
//! `all` is accepted on input and expands to both kinds. The file is rewritten
//! atomically (temp file + rename) on every change.

use fs_err as fs;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{GateError, Result};
use crate::storage::StorageConfig;
use crate::types::{SkipConfiguration, ValidationKind};

/// What a `skip` / `unskip` command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    Lint,
    Test,
    All,
}

impl SkipKind {
    pub fn kinds(self) -> &'static [ValidationKind] {
        match self {
            SkipKind::Lint => &[ValidationKind::Lint],
            SkipKind::Test => &[ValidationKind::Test],
            SkipKind::All => &ValidationKind::ALL,
        }
    }
}

impl FromStr for SkipKind {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lint" => Ok(SkipKind::Lint),
            "test" => Ok(SkipKind::Test),
            "all" => Ok(SkipKind::All),
            other => Err(GateError::InvalidSkipKind(other.to_string())),
        }
    }
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipKind::Lint => "lint",
            SkipKind::Test => "test",
            SkipKind::All => "all",
        })
    }
}

/// One directory and the kinds skipped there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEntry {
    pub path: PathBuf,
    pub kinds: Vec<ValidationKind>,
}

type RegistryData = BTreeMap<String, Vec<String>>;

pub struct SkipRegistry {
    path: PathBuf,
}

impl SkipRegistry {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            path: storage.skip_registry_file(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RegistryData> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RegistryData::new()),
            Err(source) => {
                return Err(GateError::Io {
                    context: "reading skip registry".to_string(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(RegistryData::new());
        }
        serde_json::from_str(&content).map_err(|e| GateError::RegistryCorrupted {
            path: self.path.clone(),
            details: e.to_string(),
        })
    }

    fn save(&self, data: &RegistryData) -> Result<()> {
        let io_err = |context: &str, source| GateError::Io {
            context: context.to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err("creating config dir", e))?;
        }
        let payload = serde_json::to_vec_pretty(data).map_err(|source| GateError::Json {
            context: "serializing skip registry".to_string(),
            source,
        })?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload).map_err(|e| io_err("writing skip registry", e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| io_err("committing skip registry", e))
    }

    /// Kinds stored for `key`. Unknown names are ignored for lookups.
    fn kinds_of(data: &RegistryData, key: &str) -> Vec<ValidationKind> {
        let mut kinds = Vec::new();
        for name in data.get(key).into_iter().flatten() {
            if let Ok(skip) = name.parse::<SkipKind>() {
                for kind in skip.kinds() {
                    if !kinds.contains(kind) {
                        kinds.push(*kind);
                    }
                }
            }
        }
        kinds.sort();
        kinds
    }

    fn key(dir: &Path) -> Result<String> {
        if !dir.is_absolute() {
            return Err(GateError::InvalidSkipPath(dir.to_path_buf()));
        }
        Ok(dir.to_string_lossy().into_owned())
    }

    fn store(data: &mut RegistryData, key: String, kinds: &[ValidationKind]) {
        if kinds.is_empty() {
            data.remove(&key);
        } else {
            data.insert(key, kinds.iter().map(|k| k.as_str().to_string()).collect());
        }
    }

    pub fn skip_config(&self, dir: &Path) -> Result<SkipConfiguration> {
        let key = Self::key(dir)?;
        let kinds = Self::kinds_of(&self.load()?, &key);
        Ok(SkipConfiguration {
            skip_lint: kinds.contains(&ValidationKind::Lint),
            skip_test: kinds.contains(&ValidationKind::Test),
        })
    }

    pub fn add(&self, dir: &Path, skip: SkipKind) -> Result<()> {
        let key = Self::key(dir)?;
        let mut data = self.load()?;
        let mut kinds = Self::kinds_of(&data, &key);
        let before = kinds.len();
        for kind in skip.kinds() {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        if kinds.len() == before && data.contains_key(&key) {
            return Ok(());
        }
        kinds.sort();
        Self::store(&mut data, key, &kinds);
        self.save(&data)
    }

    pub fn remove(&self, dir: &Path, skip: SkipKind) -> Result<()> {
        let key = Self::key(dir)?;
        let mut data = self.load()?;
        if !data.contains_key(&key) {
            return Ok(());
        }
        let kinds: Vec<ValidationKind> = Self::kinds_of(&data, &key)
            .into_iter()
            .filter(|k| !skip.kinds().contains(k))
            .collect();
        Self::store(&mut data, key, &kinds);
        self.save(&data)
    }

    pub fn clear(&self, dir: &Path) -> Result<()> {
        let key = Self::key(dir)?;
        let mut data = self.load()?;
        if data.remove(&key).is_none() {
            return Ok(());
        }
        self.save(&data)
    }

    /// Every configured directory, sorted by path.
    pub fn list(&self) -> Result<Vec<SkipEntry>> {
        let data = self.load()?;
        Ok(data
            .keys()
            .map(|key| SkipEntry {
                path: PathBuf::from(key),
                kinds: Self::kinds_of(&data, key),
            })
            .filter(|entry| !entry.kinds.is_empty())
            .collect())
    }
}
