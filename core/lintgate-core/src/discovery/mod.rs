//! Command discovery: find the project's own lint/test entry point.
//!
//! Walks up from the edited file's directory toward the project root. At each level
//! every probe runs in priority order before the walk moves to the parent:
//!
//! ```text
//! make  →  task  →  just  →  package.json  →  scripts/<kind>  →  go / cargo / python
//! ```
//!
//! The first probe to match anywhere in the walk wins, so a `Makefile` target in a
//! package directory beats a `package.json` script at the repo root, and a `lint`
//! target beats the language convention in the same directory.

mod package_manager;
mod probes;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::deps::{CommandSpec, Dependencies};
use crate::types::ValidationKind;

pub use package_manager::detect_package_manager;
pub use probes::{
    default_probes, GoProbe, JustProbe, MakeProbe, PackageJsonProbe, PythonProbe, RustProbe,
    ScriptsDirProbe, TaskProbe,
};

/// A command located for one kind, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCommand {
    pub kind: ValidationKind,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Which build system matched, e.g. `Makefile` or `package.json`.
    pub source: String,
}

impl DiscoveredCommand {
    pub fn new<I, S>(
        kind: ValidationKind,
        program: &str,
        args: I,
        working_dir: &Path,
        source: &str,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.to_path_buf(),
            source: source.to_string(),
        }
    }

    /// `program arg1 arg2`, as a user would type it.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    pub fn to_spec(&self) -> CommandSpec {
        CommandSpec {
            program: self.program.clone(),
            args: self.args.clone(),
            dir: self.working_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no command found for type {kind}")]
    NotFound { kind: ValidationKind },
}

/// Shared state every probe may use.
pub struct ProbeContext<'a> {
    pub deps: &'a Dependencies,
    /// Bound for dry-run verification commands (`make -n`, `task --dry`, ...).
    pub timeout: Duration,
    /// Configured JS package manager; `None` means detect.
    pub preferred_package_manager: Option<&'a str>,
}

/// One build-system check.
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;
    fn probe(&self, ctx: &ProbeContext<'_>, dir: &Path, kind: ValidationKind)
        -> Option<DiscoveredCommand>;
}

/// Walks directories and runs the probe list at each level.
pub struct CommandDiscovery {
    project_root: PathBuf,
    timeout: Duration,
    preferred_package_manager: Option<String>,
    probes: Vec<Arc<dyn Probe>>,
    deps: Dependencies,
}

impl CommandDiscovery {
    pub fn new(project_root: &Path, timeout: Duration, deps: Dependencies) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            timeout,
            preferred_package_manager: None,
            probes: default_probes(),
            deps,
        }
    }

    pub fn with_preferred_package_manager(mut self, manager: Option<String>) -> Self {
        self.preferred_package_manager = manager.filter(|m| !m.trim().is_empty());
        self
    }

    /// Replaces the probe list. Order is priority.
    pub fn with_probes(mut self, probes: Vec<Arc<dyn Probe>>) -> Self {
        self.probes = probes;
        self
    }

    pub fn discover(
        &self,
        kind: ValidationKind,
        start_dir: &Path,
    ) -> Result<DiscoveredCommand, DiscoveryError> {
        let ctx = ProbeContext {
            deps: &self.deps,
            timeout: self.timeout,
            preferred_package_manager: self.preferred_package_manager.as_deref(),
        };

        let mut current = if start_dir.as_os_str().is_empty() {
            self.project_root.clone()
        } else {
            start_dir.to_path_buf()
        };

        loop {
            for probe in &self.probes {
                if let Some(cmd) = probe.probe(&ctx, &current, kind) {
                    tracing::debug!(
                        kind = %kind,
                        probe = probe.name(),
                        command = %cmd.display(),
                        dir = %cmd.working_dir.display(),
                        "Discovered command"
                    );
                    return Ok(cmd);
                }
            }

            if current == self.project_root {
                break;
            }
            match current.parent() {
                Some(parent) if parent != current => current = parent.to_path_buf(),
                _ => break,
            }
        }

        tracing::debug!(kind = %kind, start = %start_dir.display(), "No command found");
        Err(DiscoveryError::NotFound { kind })
    }
}
