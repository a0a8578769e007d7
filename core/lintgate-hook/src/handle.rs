//! The `validate` hook handler.
//!
//! Reads the event JSON from stdin, runs validation, writes the outcome message to
//! stderr, and returns the exit code the host expects (0 = nothing to show,
//! 2 = show stderr).

use lintgate_core::{run_validate_hook, Dependencies, HookSettings, SkipRegistry, StorageConfig};
use std::io::{self, IsTerminal, Read, Write};

fn read_stdin() -> Vec<u8> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Vec::new();
    }
    let mut data = Vec::new();
    if let Err(e) = stdin.lock().read_to_end(&mut data) {
        tracing::warn!(error = %e, "Failed to read stdin");
    }
    data
}

pub fn run(storage: &StorageConfig, settings: &HookSettings) -> i32 {
    tracing::debug!(
        timeout_secs = settings.timeout.as_secs(),
        cooldown_secs = settings.cooldown_secs,
        "Starting validate hook"
    );

    let stdin = read_stdin();
    let registry = SkipRegistry::new(storage);
    let outcome = run_validate_hook(&stdin, settings, Dependencies::system(), &registry);

    if let Some(message) = &outcome.message {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", message);
    }

    tracing::debug!(exit_code = outcome.exit_code, "Validate hook finished");
    outcome.exit_code
}
