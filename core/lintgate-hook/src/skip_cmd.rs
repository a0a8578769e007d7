//! `skip` / `unskip` management commands.

use lintgate_core::{GateError, Result, SkipKind, SkipRegistry, ValidationKind};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

/// Absolute, lexically normalized form of `dir` (default: current directory).
pub fn resolve_dir(dir: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|source| GateError::Io {
        context: "getting current directory".to_string(),
        source,
    })?;
    let joined = match dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

fn describe(kind: SkipKind) -> &'static str {
    match kind {
        SkipKind::Lint => "Linting",
        SkipKind::Test => "Testing",
        SkipKind::All => "Linting and testing",
    }
}

pub fn skip(registry: &SkipRegistry, kind: SkipKind, dir: &Path) -> Result<String> {
    registry.add(dir, kind)?;
    Ok(format!("✓ {} will be skipped in {}", describe(kind), dir.display()))
}

/// Removes one kind, or everything when `kind` is `None` or `all`.
pub fn unskip(registry: &SkipRegistry, kind: Option<SkipKind>, dir: &Path) -> Result<String> {
    match kind {
        None | Some(SkipKind::All) => {
            registry.clear(dir)?;
            Ok(format!("✓ All skips removed from {}", dir.display()))
        }
        Some(kind) => {
            registry.remove(dir, kind)?;
            Ok(format!(
                "✓ {} will no longer be skipped in {}",
                describe(kind),
                dir.display()
            ))
        }
    }
}

fn kinds_label(kinds: &[ValidationKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn list(registry: &SkipRegistry) -> Result<String> {
    let entries = registry.list()?;
    if entries.is_empty() {
        return Ok("No directories have skip configurations".to_string());
    }

    let width = entries
        .iter()
        .map(|e| e.path.to_string_lossy().len())
        .max()
        .unwrap_or(0)
        .max("Directory".len());

    let mut out = String::from("Skip configurations:\n");
    let _ = writeln!(out, "{:<width$}  Skip Types", "Directory");
    for entry in &entries {
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            entry.path.display().to_string(),
            kinds_label(&entry.kinds)
        );
    }
    Ok(out.trim_end().to_string())
}

pub fn status(registry: &SkipRegistry, dir: &Path) -> Result<String> {
    let config = registry.skip_config(dir)?;
    if !config.skip_lint && !config.skip_test {
        return Ok(format!("No skips configured for {}", dir.display()));
    }
    let state = |skipped: bool| if skipped { "SKIPPED" } else { "Active" };
    Ok(format!(
        "Skip status for {}:\n  Linting  {}\n  Testing  {}",
        dir.display(),
        state(config.skip_lint),
        state(config.skip_test)
    ))
}
