//! # lintgate-core
//!
//! Core library for lintgate: after every file edit, find the project's own lint
//! and test commands, run them side by side under a deadline, and report one
//! actionable message.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. The two validations run on scoped threads.
//! - **One run per project**: A cross-process lock file with stale-holder recovery
//!   and a cooldown window keeps bursts of edits from piling up runs.
//! - **Injected world**: Clock, process table, filesystem and command launcher are
//!   traits bundled in [`Dependencies`], so every component is testable without
//!   sleeping or spawning.
//! - **Failures are data**: A failing lint run is an [`ExecutionResult`], not an
//!   error. [`GateError`] is reserved for things a caller can act on.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lintgate_core::{run_validate_hook, Dependencies, HookSettings, SkipRegistry, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let outcome = run_validate_hook(
//!     &stdin_bytes,
//!     &HookSettings::default(),
//!     Dependencies::system(),
//!     &SkipRegistry::new(&storage),
//! );
//! ```

pub mod config;
pub mod deps;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod hook;
pub mod input;
pub mod lock;
pub mod patterns;
pub mod process;
pub mod project;
pub mod skip;
pub mod storage;
pub mod types;
pub mod validate;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export commonly used items at crate root
pub use config::{load_settings, CliOverrides, ConfigFile, HookSettings};
pub use deps::{CommandRunner, CommandSpec, Dependencies, Exit, FileSystem, ProcessOutput};
pub use discovery::{CommandDiscovery, DiscoveredCommand, DiscoveryError, Probe};
pub use error::{GateError, Result};
pub use executor::{CommandExecutor, ExecutionResult};
pub use hook::{run_validate_hook, HookOutcome, EXIT_SHOW_MESSAGE};
pub use input::HookInput;
pub use lock::{Acquisition, LockManager};
pub use patterns::should_skip_file;
pub use project::find_project_root;
pub use skip::{SkipEntry, SkipKind, SkipRegistry};
pub use storage::StorageConfig;
pub use types::{SkipConfiguration, ValidationKind};
pub use validate::{ParallelValidateExecutor, ValidateResult, ValidationOutcome};
