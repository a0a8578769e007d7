//! Project root resolution.

use std::path::{Path, PathBuf};

use crate::deps::FileSystem;

/// Files or directories whose presence marks a project root.
pub const ROOT_MARKERS: &[&str] = &[
    ".git",
    "go.mod",
    "package.json",
    "Cargo.toml",
    "setup.py",
    "pyproject.toml",
    "Makefile",
    "justfile",
    "Justfile",
];

/// Walks up from `start_dir` to the nearest directory holding a root marker.
///
/// `start_dir` is made absolute against the current directory first. Without any
/// marker the (absolute) start directory is returned.
pub fn find_project_root(fs: &dyn FileSystem, start_dir: &Path) -> PathBuf {
    let start = absolutize(start_dir);

    let mut current = start.as_path();
    loop {
        if ROOT_MARKERS
            .iter()
            .any(|marker| fs.exists(&current.join(marker)))
        {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    start
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
