//! Configuration loading and precedence.
//!
//! Effective settings come from, highest first: explicit CLI flags, environment
//! variables, `config.json`, built-in defaults. A missing or malformed config file
//! never stops the hook; it falls back to defaults.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GateError, Result};
use crate::storage::StorageConfig;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COOLDOWN_SECS: u64 = 5;

pub const ENV_TIMEOUT: &str = "LINTGATE_VALIDATE_TIMEOUT_SECONDS";
pub const ENV_COOLDOWN: &str = "LINTGATE_VALIDATE_COOLDOWN_SECONDS";
pub const ENV_DEBUG: &str = "LINTGATE_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateSection {
    /// Per-kind deadline in seconds.
    pub timeout: u64,
    /// Seconds after a run during which new runs are refused.
    pub cooldown: u64,
}

impl Default for ValidateSection {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            cooldown: DEFAULT_COOLDOWN_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageManagerSection {
    /// `npm`, `yarn`, `pnpm` or `bun`. Empty means detect from lock files.
    pub preferred: String,
}

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub validate: ValidateSection,
    pub package_manager: PackageManagerSection,
}

/// Loads `config.json`, returning defaults if it doesn't exist or can't be parsed.
pub fn load_config(storage: &StorageConfig) -> ConfigFile {
    let path = storage.config_file();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return ConfigFile::default(),
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
        ConfigFile::default()
    })
}

/// Writes `config.json`, creating the storage root if needed.
pub fn save_config(storage: &StorageConfig, config: &ConfigFile) -> Result<()> {
    let path = storage.config_file();
    let content = serde_json::to_string_pretty(config).map_err(|source| GateError::Json {
        context: "serializing config".to_string(),
        source,
    })?;
    fs::create_dir_all(storage.root())
        .and_then(|_| fs::write(&path, content))
        .map_err(|source| GateError::ConfigWriteFailed { path, source })
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub timeout_secs: Option<u64>,
    pub cooldown_secs: Option<u64>,
    pub debug: bool,
}

/// Fully resolved settings for one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookSettings {
    #[serde(with = "secs")]
    pub timeout: Duration,
    pub cooldown_secs: u64,
    pub debug: bool,
    pub preferred_package_manager: Option<String>,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            debug: false,
            preferred_package_manager: None,
        }
    }
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

fn parse_secs(raw: Option<String>, allow_zero: bool) -> Option<u64> {
    let value = raw?.trim().parse::<u64>().ok()?;
    (allow_zero || value > 0).then_some(value)
}

pub fn debug_from_env(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

/// Merges CLI flags, environment and file config. `env` looks up one variable.
pub fn resolve_settings(
    cli: CliOverrides,
    env: impl Fn(&str) -> Option<String>,
    file: &ConfigFile,
) -> HookSettings {
    let file_timeout = (file.validate.timeout > 0).then_some(file.validate.timeout);

    let timeout_secs = cli
        .timeout_secs
        .filter(|t| *t > 0)
        .or_else(|| parse_secs(env(ENV_TIMEOUT), false))
        .or(file_timeout)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let cooldown_secs = cli
        .cooldown_secs
        .or_else(|| parse_secs(env(ENV_COOLDOWN), true))
        .unwrap_or(file.validate.cooldown);

    let preferred = file.package_manager.preferred.trim();

    HookSettings {
        timeout: Duration::from_secs(timeout_secs),
        cooldown_secs,
        debug: cli.debug || debug_from_env(env(ENV_DEBUG)),
        preferred_package_manager: (!preferred.is_empty()).then(|| preferred.to_string()),
    }
}

/// [`resolve_settings`] against the process environment and the stored config.
pub fn load_settings(storage: &StorageConfig, cli: CliOverrides) -> HookSettings {
    resolve_settings(cli, |key| std::env::var(key).ok(), &load_config(storage))
}
