//! JavaScript package manager detection.

use std::path::Path;

use crate::deps::FileSystem;

const ENV_OVERRIDE: &str = "PREFERRED_PACKAGE_MANAGER";
const DEFAULT_MANAGER: &str = "npm";

/// Lock files in detection order. First match wins.
const LOCK_FILES: &[(&str, &str)] = &[
    ("bun.lock", "bun"),
    ("bun.lockb", "bun"),
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("package-lock.json", "npm"),
];

/// Picks the manager used to run a `package.json` script in `dir`.
///
/// Order: configured preference, `PREFERRED_PACKAGE_MANAGER`, lock file, `npm`.
pub fn detect_package_manager(fs: &dyn FileSystem, dir: &Path, preferred: Option<&str>) -> String {
    if let Some(manager) = preferred.filter(|m| !m.is_empty()) {
        return manager.to_string();
    }

    if let Ok(manager) = std::env::var(ENV_OVERRIDE) {
        if !manager.trim().is_empty() {
            return manager.trim().to_string();
        }
    }

    from_lock_files(fs, dir)
}

fn from_lock_files(fs: &dyn FileSystem, dir: &Path) -> String {
    LOCK_FILES
        .iter()
        .find(|(file, _)| fs.exists(&dir.join(file)))
        .map(|(_, manager)| manager.to_string())
        .unwrap_or_else(|| DEFAULT_MANAGER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;

    #[test]
    fn lock_file_order() {
        let fs = MemFs::new();
        fs.add_file("/p/yarn.lock", "");
        assert_eq!(from_lock_files(&fs, Path::new("/p")), "yarn");

        fs.add_file("/p/pnpm-lock.yaml", "");
        assert_eq!(from_lock_files(&fs, Path::new("/p")), "pnpm");

        fs.add_file("/p/bun.lockb", "");
        assert_eq!(from_lock_files(&fs, Path::new("/p")), "bun");
    }

    #[test]
    fn defaults_to_npm() {
        let fs = MemFs::new();
        assert_eq!(from_lock_files(&fs, Path::new("/p")), "npm");
    }

    #[test]
    fn configured_preference_wins() {
        let fs = MemFs::new();
        fs.add_file("/p/yarn.lock", "");
        assert_eq!(
            detect_package_manager(&fs, Path::new("/p"), Some("pnpm")),
            "pnpm"
        );
    }
}
