//! File exclusion policy.
//!
//! Edits to vendored, generated, build-output and test files never trigger a
//! validation run. The patterns are compiled once on first use.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Directory Exclusions
// ═══════════════════════════════════════════════════════════════════════════════

/// Any path segment naming a dependency, VCS, cache or build-output directory.
pub static RE_EXCLUDED_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(vendor|node_modules|build|\.git|dist|__pycache__|\.cache|target|\.next)/")
        .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════════
// File Name Exclusions
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_TEST_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(_test\.(go|py)|\.(test|spec)\.(js|ts|jsx|tsx))$").unwrap());

pub static RE_GENERATED_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.generated\.go|\.pb\.go|\.gen\.go|_gen\.go)$").unwrap());

/// True when an edit to `file_path` should not trigger validation.
pub fn should_skip_file(file_path: &str) -> bool {
    RE_EXCLUDED_DIR.is_match(file_path)
        || RE_TEST_FILE.is_match(file_path)
        || RE_GENERATED_FILE.is_match(file_path)
}
