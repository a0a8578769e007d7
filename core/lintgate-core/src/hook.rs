//! The `validate` hook: one editing event in, at most one message out.
//!
//! ```text
//! stdin JSON ─► edit event? ─► excluded file? ─► project root ─► skip registry
//!                                                                    │
//!            message + exit 2 ◄─ release ◄─ lint ∥ test ◄─ lock ◄────┘
//! ```
//!
//! Every early exit is quiet (exit 0, no message). The host only sees output when
//! validation actually ran, and then always with [`EXIT_SHOW_MESSAGE`].

use std::path::{Path, PathBuf};

use crate::config::HookSettings;
use crate::deps::Dependencies;
use crate::input::{HookInput, InputError};
use crate::lock::{Acquisition, LockManager};
use crate::patterns::should_skip_file;
use crate::project::find_project_root;
use crate::skip::SkipRegistry;
use crate::types::SkipConfiguration;
use crate::validate::ParallelValidateExecutor;

/// Exit status telling the host to surface stderr.
pub const EXIT_SHOW_MESSAGE: i32 = 2;

/// Lock label shared by every validate run on a project.
pub const VALIDATE_LOCK_NAME: &str = "validate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub exit_code: i32,
    pub message: Option<String>,
}

impl HookOutcome {
    pub fn quiet() -> Self {
        Self {
            exit_code: 0,
            message: None,
        }
    }

    fn show(message: String) -> Self {
        Self {
            exit_code: EXIT_SHOW_MESSAGE,
            message: Some(message),
        }
    }
}

fn edited_path(file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn skip_flags(registry: &SkipRegistry, project_root: &Path) -> SkipConfiguration {
    registry.skip_config(project_root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Skip registry unavailable, validating everything");
        SkipConfiguration::default()
    })
}

/// Runs the full validate sequence for one stdin payload.
pub fn run_validate_hook(
    stdin: &[u8],
    settings: &HookSettings,
    deps: Dependencies,
    registry: &SkipRegistry,
) -> HookOutcome {
    let input = match HookInput::parse(stdin) {
        Ok(input) => input,
        Err(InputError::Empty) => {
            tracing::debug!("No hook input");
            return HookOutcome::quiet();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable hook input");
            return HookOutcome::quiet();
        }
    };

    let Some(file) = input.edited_file() else {
        tracing::debug!(
            event = %input.hook_event_name,
            tool = %input.tool_name,
            "Ignoring event"
        );
        return HookOutcome::quiet();
    };

    if should_skip_file(file) {
        tracing::debug!(file, "File excluded from validation");
        return HookOutcome::quiet();
    }

    let file_path = edited_path(file);
    let file_dir = file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    let project_root = find_project_root(deps.fs.as_ref(), &file_dir);

    let skip = skip_flags(registry, &project_root);
    if skip.skips_everything() {
        tracing::debug!(root = %project_root.display(), "Lint and test both skipped");
        return HookOutcome::quiet();
    }

    let lock = LockManager::new(
        &project_root,
        VALIDATE_LOCK_NAME,
        settings.cooldown_secs,
        deps.clone(),
    );
    match lock.try_acquire() {
        Acquisition::Acquired => {}
        other => {
            tracing::debug!(root = %project_root.display(), outcome = ?other, "Lock not acquired");
            return HookOutcome::quiet();
        }
    }

    tracing::info!(
        file = %file_path.display(),
        root = %project_root.display(),
        skip_lint = skip.skip_lint,
        skip_test = skip.skip_test,
        "Validating"
    );

    let result = ParallelValidateExecutor::new(&project_root, settings.timeout, skip, deps)
        .with_preferred_package_manager(settings.preferred_package_manager.clone())
        .execute_validations(&file_dir);

    if let Err(e) = lock.release() {
        tracing::warn!(error = %e, "Failed to release lock");
    }

    HookOutcome::show(result.format_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::lock_file_path;
    use crate::storage::StorageConfig;
    use crate::skip::SkipKind;
    use crate::testing::{exited, FakeWorld};
    use crate::validate::PASS_MESSAGE;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    fn edit_event(path: &str) -> Vec<u8> {
        serde_json::json!({
            "hook_event_name": "PostToolUse",
            "tool_name": "Edit",
            "tool_input": { "file_path": path }
        })
        .to_string()
        .into_bytes()
    }

    struct Fixture {
        world: FakeWorld,
        _config: TempDir,
        registry: SkipRegistry,
        settings: HookSettings,
    }

    impl Fixture {
        /// `/proj` with a Makefile whose lint/test exit with the given codes.
        fn new(lint_code: i32, test_code: i32) -> Self {
            let world = FakeWorld::new(4242, NOW);
            world.fs.add_file("/proj/Makefile", "lint:\ntest:\n");
            world.fs.add_dir("/proj/src");
            for kind in ["lint", "test"] {
                world
                    .runner
                    .succeed("make", &["-f", "/proj/Makefile", "-n", kind]);
            }
            world.runner.respond("make", &["lint"], exited(lint_code, "", ""));
            world.runner.respond("make", &["test"], exited(test_code, "", ""));

            let config = tempfile::tempdir().unwrap();
            let registry = SkipRegistry::new(&StorageConfig::with_root(config.path().to_path_buf()));
            Self {
                world,
                _config: config,
                registry,
                settings: HookSettings::default(),
            }
        }

        fn run(&self, stdin: &[u8]) -> HookOutcome {
            run_validate_hook(stdin, &self.settings, self.world.deps(), &self.registry)
        }

        fn lock_path(&self) -> PathBuf {
            lock_file_path(Path::new("/tmp"), Path::new("/proj"), VALIDATE_LOCK_NAME)
        }
    }

    #[test]
    fn test_pass_shows_message_with_exit_2() {
        let fx = Fixture::new(0, 0);
        let outcome = fx.run(&edit_event("/proj/src/main.go"));

        assert_eq!(outcome.exit_code, EXIT_SHOW_MESSAGE);
        assert_eq!(outcome.message.as_deref(), Some(PASS_MESSAGE));
    }

    #[test]
    fn test_lint_failure_message() {
        let fx = Fixture::new(1, 0);
        let outcome = fx.run(&edit_event("/proj/src/main.go"));

        assert_eq!(outcome.exit_code, EXIT_SHOW_MESSAGE);
        assert_eq!(
            outcome.message.as_deref(),
            Some("⛔ BLOCKING: Run 'cd /proj && make lint' to fix lint failures")
        );
    }

    #[test]
    fn test_lock_is_released_into_cooldown() {
        let fx = Fixture::new(1, 1);
        fx.run(&edit_event("/proj/src/main.go"));

        assert_eq!(
            fx.world.fs.contents(fx.lock_path()).as_deref(),
            Some(format!("\n{}\n", NOW).as_str())
        );

        // Second edit inside the cooldown window is quiet and runs nothing.
        let calls_before = fx.world.runner.calls().len();
        let outcome = fx.run(&edit_event("/proj/src/other.go"));
        assert_eq!(outcome, HookOutcome::quiet());
        assert_eq!(fx.world.runner.calls().len(), calls_before);
    }

    #[test]
    fn test_busy_lock_exits_quietly() {
        let fx = Fixture::new(0, 0);
        fx.world.process.spawn(777);
        fx.world.fs.add_file(fx.lock_path(), "777\n\n");

        let outcome = fx.run(&edit_event("/proj/src/main.go"));

        assert_eq!(outcome, HookOutcome::quiet());
        assert!(fx.world.runner.calls().is_empty());
        assert_eq!(fx.world.fs.contents(fx.lock_path()).as_deref(), Some("777\n\n"));
    }

    #[test]
    fn test_ignored_inputs_are_quiet() {
        let fx = Fixture::new(1, 1);
        let read_event = serde_json::json!({
            "hook_event_name": "PostToolUse",
            "tool_name": "Read",
            "tool_input": { "file_path": "/proj/src/main.go" }
        })
        .to_string();

        for stdin in [
            b"".to_vec(),
            b"{garbage".to_vec(),
            read_event.into_bytes(),
            edit_event("/proj/vendor/lib/x.go"),
            edit_event("/proj/src/main_test.go"),
        ] {
            assert_eq!(fx.run(&stdin), HookOutcome::quiet());
        }
        assert!(fx.world.runner.calls().is_empty());
    }

    #[test]
    fn test_skip_registry_both_kinds_is_quiet() {
        let fx = Fixture::new(1, 1);
        fx.registry.add(Path::new("/proj"), SkipKind::All).unwrap();

        assert_eq!(fx.run(&edit_event("/proj/src/main.go")), HookOutcome::quiet());
        assert!(fx.world.fs.contents(fx.lock_path()).is_none());
    }

    #[test]
    fn test_skip_registry_single_kind() {
        let fx = Fixture::new(1, 0);
        fx.registry.add(Path::new("/proj"), SkipKind::Lint).unwrap();

        let outcome = fx.run(&edit_event("/proj/src/main.go"));

        assert_eq!(outcome.message.as_deref(), Some(PASS_MESSAGE));
        assert!(!fx.world.runner.ran("make", &["lint"]));
    }

    #[test]
    fn test_nothing_discovered_still_reports_pass() {
        let world = FakeWorld::new(1, NOW);
        world.fs.add_dir("/bare/.git");
        let config = tempfile::tempdir().unwrap();
        let registry = SkipRegistry::new(&StorageConfig::with_root(config.path().to_path_buf()));

        let outcome = run_validate_hook(
            &edit_event("/bare/notes.txt"),
            &HookSettings::default(),
            world.deps(),
            &registry,
        );

        assert_eq!(outcome.exit_code, EXIT_SHOW_MESSAGE);
        assert_eq!(outcome.message.as_deref(), Some(PASS_MESSAGE));
    }
}
