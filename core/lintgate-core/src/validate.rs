//! Parallel lint + test validation.
//!
//! Each kind moves through `Skipped → NotFound → Ran → Success | Failure`. Skipped
//! and not-found kinds pass vacuously. The two discovered commands run on scoped
//! threads that each own their result slot, so no locking is needed to assemble
//! the [`ValidateResult`].

use std::path::Path;
use std::time::Duration;

use crate::deps::Dependencies;
use crate::discovery::{CommandDiscovery, DiscoveredCommand};
use crate::executor::{CommandExecutor, ExecutionResult};
use crate::types::{SkipConfiguration, ValidationKind};

pub const PASS_MESSAGE: &str = "👉 Validations pass. Continue with your task.";

/// Outcome of one kind that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub kind: ValidationKind,
    pub command: DiscoveredCommand,
    pub result: ExecutionResult,
}

impl ValidationOutcome {
    pub fn success(&self) -> bool {
        self.result.success
    }

    /// `cd <dir> && <cmd>`, plus a timeout marker when the run hit its deadline.
    fn reproduction(&self, timeout: Duration) -> (String, String) {
        let repro = format!(
            "cd {} && {}",
            self.command.working_dir.display(),
            self.command.display()
        );
        let suffix = if self.result.timed_out {
            format!(" (timed out after {}s)", timeout.as_secs())
        } else {
            String::new()
        };
        (repro, suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateResult {
    pub lint: Option<ValidationOutcome>,
    pub test: Option<ValidationOutcome>,
    pub both_passed: bool,
    /// Per-kind deadline, echoed in timeout messages.
    pub timeout: Duration,
}

impl ValidateResult {
    fn failed(slot: &Option<ValidationOutcome>) -> Option<&ValidationOutcome> {
        slot.as_ref().filter(|outcome| !outcome.success())
    }

    /// The single message shown to the host.
    pub fn format_message(&self) -> String {
        if self.both_passed {
            return PASS_MESSAGE.to_string();
        }

        match (Self::failed(&self.lint), Self::failed(&self.test)) {
            (Some(lint), Some(test)) => {
                let (lint_repro, lint_suffix) = lint.reproduction(self.timeout);
                let (test_repro, test_suffix) = test.reproduction(self.timeout);
                format!(
                    "⛔ BLOCKING: Lint and test failures. Run '{}'{} and '{}'{}",
                    lint_repro, lint_suffix, test_repro, test_suffix
                )
            }
            (Some(outcome), None) | (None, Some(outcome)) => {
                let (repro, suffix) = outcome.reproduction(self.timeout);
                format!(
                    "⛔ BLOCKING: Run '{}' to fix {} failures{}",
                    repro, outcome.kind, suffix
                )
            }
            (None, None) => PASS_MESSAGE.to_string(),
        }
    }
}

/// Discovers and runs both kinds for one edited file.
pub struct ParallelValidateExecutor {
    discovery: CommandDiscovery,
    executor: CommandExecutor,
    skip: SkipConfiguration,
}

impl ParallelValidateExecutor {
    pub fn new(
        project_root: &Path,
        timeout: Duration,
        skip: SkipConfiguration,
        deps: Dependencies,
    ) -> Self {
        Self {
            discovery: CommandDiscovery::new(project_root, timeout, deps.clone()),
            executor: CommandExecutor::new(timeout, deps),
            skip,
        }
    }

    pub fn with_preferred_package_manager(mut self, manager: Option<String>) -> Self {
        self.discovery = self.discovery.with_preferred_package_manager(manager);
        self
    }

    fn discover(&self, kind: ValidationKind, file_dir: &Path) -> Option<DiscoveredCommand> {
        if self.skip.skips(kind) {
            tracing::debug!(kind = %kind, "Skipped by registry");
            return None;
        }
        match self.discovery.discover(kind, file_dir) {
            Ok(cmd) => Some(cmd),
            Err(e) => {
                tracing::debug!(kind = %kind, error = %e, "Nothing to validate");
                None
            }
        }
    }

    fn run(&self, command: DiscoveredCommand) -> ValidationOutcome {
        let result = self.executor.execute(&command);
        ValidationOutcome {
            kind: command.kind,
            command,
            result,
        }
    }

    pub fn execute_validations(&self, file_dir: &Path) -> ValidateResult {
        let lint_cmd = self.discover(ValidationKind::Lint, file_dir);
        let test_cmd = self.discover(ValidationKind::Test, file_dir);
        let timeout = self.executor.timeout();

        if lint_cmd.is_none() && test_cmd.is_none() {
            return ValidateResult {
                lint: None,
                test: None,
                both_passed: true,
                timeout,
            };
        }

        let (lint, test) = std::thread::scope(|scope| {
            let lint_handle = lint_cmd.map(|cmd| scope.spawn(move || self.run(cmd)));
            let test = test_cmd.map(|cmd| self.run(cmd));
            let lint = lint_handle.map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            });
            (lint, test)
        });

        let passed = |slot: &Option<ValidationOutcome>| slot.as_ref().map_or(true, |o| o.success());
        let both_passed = passed(&lint) && passed(&test);

        tracing::info!(
            lint = ?lint.as_ref().map(|o| o.result.exit_code),
            test = ?test.as_ref().map(|o| o.result.exit_code),
            both_passed,
            "Validation finished"
        );

        ValidateResult {
            lint,
            test,
            both_passed,
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{exited, timed_out, FakeWorld};
    use std::time::Instant;

    /// `/proj/Makefile` exposing both targets, with the given exit codes.
    fn make_project(world: &FakeWorld, lint_code: i32, test_code: i32) {
        world.fs.add_file("/proj/Makefile", "lint:\ntest:\n");
        world
            .runner
            .succeed("make", &["-f", "/proj/Makefile", "-n", "lint"]);
        world
            .runner
            .succeed("make", &["-f", "/proj/Makefile", "-n", "test"]);
        world
            .runner
            .respond("make", &["lint"], exited(lint_code, "", ""));
        world
            .runner
            .respond("make", &["test"], exited(test_code, "", ""));
    }

    fn validator(world: &FakeWorld, skip: SkipConfiguration) -> ParallelValidateExecutor {
        ParallelValidateExecutor::new(
            Path::new("/proj"),
            Duration::from_secs(60),
            skip,
            world.deps(),
        )
    }

    #[test]
    fn test_vacuous_pass_when_nothing_found() {
        let world = FakeWorld::new(1, 0);
        world.fs.add_dir("/proj/src");

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj/src"));

        assert!(result.both_passed);
        assert!(result.lint.is_none());
        assert!(result.test.is_none());
        assert_eq!(result.format_message(), PASS_MESSAGE);
    }

    #[test]
    fn test_both_pass() {
        let world = FakeWorld::new(1, 0);
        make_project(&world, 0, 0);

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj"));

        assert!(result.both_passed);
        assert!(result.lint.as_ref().unwrap().success());
        assert!(result.test.as_ref().unwrap().success());
        assert_eq!(result.format_message(), PASS_MESSAGE);
    }

    #[test]
    fn test_lint_only_failure_names_lint_command() {
        let world = FakeWorld::new(1, 0);
        make_project(&world, 1, 0);

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj"));

        assert!(!result.both_passed);
        assert_eq!(
            result.format_message(),
            "⛔ BLOCKING: Run 'cd /proj && make lint' to fix lint failures"
        );
    }

    #[test]
    fn test_test_only_failure_names_test_command() {
        let world = FakeWorld::new(1, 0);
        make_project(&world, 0, 3);

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj"));

        assert!(!result.both_passed);
        assert_eq!(result.test.as_ref().unwrap().result.exit_code, 3);
        let message = result.format_message();
        assert_eq!(
            message,
            "⛔ BLOCKING: Run 'cd /proj && make test' to fix test failures"
        );
        assert!(!message.contains("lint"));
    }

    #[test]
    fn test_both_failures_name_both_commands() {
        let world = FakeWorld::new(1, 0);
        make_project(&world, 1, 1);

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj"));

        assert_eq!(
            result.format_message(),
            "⛔ BLOCKING: Lint and test failures. Run 'cd /proj && make lint' and 'cd /proj && make test'"
        );
    }

    #[test]
    fn test_timeout_is_reported_in_message() {
        let world = FakeWorld::new(1, 0);
        make_project(&world, 0, 0);
        world.runner.respond("make", &["test"], timed_out(""));

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj"));

        let test = result.test.as_ref().unwrap();
        assert!(test.result.timed_out);
        assert!(!test.success());
        assert_eq!(
            result.format_message(),
            "⛔ BLOCKING: Run 'cd /proj && make test' to fix test failures (timed out after 60s)"
        );
    }

    #[test]
    fn test_skipped_kind_is_not_discovered_or_run() {
        let world = FakeWorld::new(1, 0);
        make_project(&world, 1, 0);

        let skip = SkipConfiguration {
            skip_lint: true,
            skip_test: false,
        };
        let result = validator(&world, skip).execute_validations(Path::new("/proj"));

        assert!(result.both_passed);
        assert!(result.lint.is_none());
        assert!(!world.runner.ran("make", &["lint"]));
        assert!(!world
            .runner
            .ran("make", &["-f", "/proj/Makefile", "-n", "lint"]));
        assert!(world.runner.ran("make", &["test"]));
    }

    #[test]
    fn test_failure_in_different_directories() {
        let world = FakeWorld::new(1, 0);
        world.fs.add_file("/proj/Cargo.toml", "");
        world.fs.add_executable("/proj/crate/scripts/lint", "");
        world
            .runner
            .respond("./scripts/lint", &[], exited(1, "", ""));
        world.runner.fail("cargo", &["test"], 101);

        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj/crate"));

        assert_eq!(
            result.format_message(),
            "⛔ BLOCKING: Lint and test failures. Run 'cd /proj/crate && ./scripts/lint' and 'cd /proj && cargo test'"
        );
    }

    #[test]
    fn test_kinds_run_concurrently() {
        let world = FakeWorld::new(1, 0);
        world.fs.add_file("/proj/Cargo.toml", "");
        world.runner.succeed("cargo", &["clippy", "--", "-D", "warnings"]);
        world.runner.succeed("cargo", &["test"]);
        world.runner.delay_each_run(Duration::from_millis(400));

        let started = Instant::now();
        let result = validator(&world, SkipConfiguration::default())
            .execute_validations(Path::new("/proj"));

        assert!(result.both_passed);
        assert!(started.elapsed() < Duration::from_millis(750));
    }
}
