//! Build-system probes, highest priority first.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use std::collections::BTreeMap;

use super::package_manager::detect_package_manager;
use super::{DiscoveredCommand, Probe, ProbeContext};
use crate::deps::CommandSpec;
use crate::types::ValidationKind;

/// Probe order used at every directory level.
pub fn default_probes() -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(MakeProbe),
        Arc::new(TaskProbe),
        Arc::new(JustProbe),
        Arc::new(PackageJsonProbe),
        Arc::new(ScriptsDirProbe),
        Arc::new(GoProbe),
        Arc::new(RustProbe),
        Arc::new(PythonProbe),
    ]
}

/// Runs a dry-run verification command; exit 0 means the target exists.
fn dry_run(ctx: &ProbeContext<'_>, dir: &Path, program: &str, args: &[&str]) -> bool {
    let spec = CommandSpec::new(program, args.iter().copied(), dir);
    ctx.deps.runner.run(&spec, ctx.timeout).success()
}

/// Shared shape of the make/task/just probes: for each candidate file present in
/// `dir`, ask the tool whether the target exists.
fn probe_task_runner(
    ctx: &ProbeContext<'_>,
    dir: &Path,
    kind: ValidationKind,
    program: &str,
    file_names: &[&str],
    verify: impl Fn(&str, &str) -> Vec<String>,
) -> Option<DiscoveredCommand> {
    let target = kind.as_str();
    for file_name in file_names {
        let path = dir.join(file_name);
        if !ctx.deps.fs.exists(&path) {
            continue;
        }
        let path_str = path.to_string_lossy();
        let args = verify(&path_str, target);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if dry_run(ctx, dir, program, &args) {
            return Some(DiscoveredCommand::new(
                kind,
                program,
                [target],
                dir,
                file_name,
            ));
        }
        tracing::debug!(program, target, file = %path.display(), "Target not found");
    }
    None
}

pub struct MakeProbe;

impl Probe for MakeProbe {
    fn name(&self) -> &'static str {
        "make"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        probe_task_runner(ctx, dir, kind, "make", &["Makefile", "makefile"], |file, target| {
            vec!["-f".into(), file.into(), "-n".into(), target.into()]
        })
    }
}

pub struct TaskProbe;

impl Probe for TaskProbe {
    fn name(&self) -> &'static str {
        "task"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        probe_task_runner(
            ctx,
            dir,
            kind,
            "task",
            &["Taskfile.yml", "Taskfile.yaml"],
            |file, target| vec!["--taskfile".into(), file.into(), "--dry".into(), target.into()],
        )
    }
}

pub struct JustProbe;

impl Probe for JustProbe {
    fn name(&self) -> &'static str {
        "just"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        probe_task_runner(
            ctx,
            dir,
            kind,
            "just",
            &["justfile", "Justfile", ".justfile"],
            |file, target| vec!["--justfile".into(), file.into(), "--show".into(), target.into()],
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    scripts: BTreeMap<String, serde_json::Value>,
}

pub struct PackageJsonProbe;

impl Probe for PackageJsonProbe {
    fn name(&self) -> &'static str {
        "package.json"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        let path = dir.join("package.json");
        let content = ctx.deps.fs.read_to_string(&path).ok()?;
        let manifest: PackageManifest = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "Unreadable package.json");
                return None;
            }
        };

        // A `null` or `false` script counts as absent.
        let script = kind.as_str();
        match manifest.scripts.get(script) {
            Some(value) if !value.is_null() && value != &serde_json::Value::Bool(false) => {}
            _ => {
                tracing::debug!(script, file = %path.display(), "Script not found");
                return None;
            }
        }

        let manager =
            detect_package_manager(ctx.deps.fs.as_ref(), dir, ctx.preferred_package_manager);
        Some(DiscoveredCommand::new(
            kind,
            &manager,
            ["run", script],
            dir,
            "package.json",
        ))
    }
}

pub struct ScriptsDirProbe;

impl Probe for ScriptsDirProbe {
    fn name(&self) -> &'static str {
        "scripts"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        let script = dir.join("scripts").join(kind.as_str());
        let stat = ctx.deps.fs.stat(&script).ok()?;
        if stat.is_dir || !stat.executable {
            tracing::debug!(file = %script.display(), "Script exists but is not executable");
            return None;
        }
        Some(DiscoveredCommand::new(
            kind,
            &format!("./scripts/{}", kind.as_str()),
            Vec::<String>::new(),
            dir,
            "scripts/",
        ))
    }
}

pub struct GoProbe;

impl Probe for GoProbe {
    fn name(&self) -> &'static str {
        "go"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        if !ctx.deps.fs.exists(&dir.join("go.mod")) {
            return None;
        }
        let cmd = match kind {
            ValidationKind::Lint if ctx.deps.runner.look_path("golangci-lint").is_some() => {
                DiscoveredCommand::new(kind, "golangci-lint", ["run"], dir, "go.mod")
            }
            ValidationKind::Lint => DiscoveredCommand::new(kind, "go", ["vet", "./..."], dir, "go.mod"),
            ValidationKind::Test => {
                DiscoveredCommand::new(kind, "go", ["test", "./..."], dir, "go.mod")
            }
        };
        Some(cmd)
    }
}

pub struct RustProbe;

impl Probe for RustProbe {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        if !ctx.deps.fs.exists(&dir.join("Cargo.toml")) {
            return None;
        }
        let cmd = match kind {
            ValidationKind::Lint => DiscoveredCommand::new(
                kind,
                "cargo",
                ["clippy", "--", "-D", "warnings"],
                dir,
                "Cargo.toml",
            ),
            ValidationKind::Test => DiscoveredCommand::new(kind, "cargo", ["test"], dir, "Cargo.toml"),
        };
        Some(cmd)
    }
}

const PYTHON_MARKERS: &[&str] = &["pyproject.toml", "setup.py", "requirements.txt"];

const PYTHON_LINTERS: &[(&str, &[&str])] = &[
    ("ruff", &["check", "."]),
    ("flake8", &["."]),
    ("pylint", &["."]),
];

const PYTHON_SOURCE: &str = "Python project";

pub struct PythonProbe;

impl Probe for PythonProbe {
    fn name(&self) -> &'static str {
        "python"
    }

    fn probe(
        &self,
        ctx: &ProbeContext<'_>,
        dir: &Path,
        kind: ValidationKind,
    ) -> Option<DiscoveredCommand> {
        if !PYTHON_MARKERS
            .iter()
            .any(|marker| ctx.deps.fs.exists(&dir.join(marker)))
        {
            return None;
        }

        match kind {
            ValidationKind::Lint => PYTHON_LINTERS
                .iter()
                .find(|(linter, _)| ctx.deps.runner.look_path(linter).is_some())
                .map(|(linter, args)| {
                    DiscoveredCommand::new(kind, linter, args.iter().copied(), dir, PYTHON_SOURCE)
                }),
            ValidationKind::Test if ctx.deps.runner.look_path("pytest").is_some() => Some(
                DiscoveredCommand::new(kind, "pytest", Vec::<String>::new(), dir, PYTHON_SOURCE),
            ),
            ValidationKind::Test => Some(DiscoveredCommand::new(
                kind,
                "python",
                ["-m", "unittest"],
                dir,
                PYTHON_SOURCE,
            )),
        }
    }
}
