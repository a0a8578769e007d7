//! Cross-process run lock with staleness detection and cooldown.
//!
//! Each edit event spawns a fresh hook process. Without a lock, a burst of edits
//! would start a burst of overlapping `make lint` / `make test` runs on the same
//! project. The lock guarantees at most one validation run per (workspace, hook)
//! at a time, and the cooldown throttles back-to-back runs.
//!
//! # Lock File
//!
//! Location: `{tmp}/lintgate-{hook}-{hash}.lock` where `{hash}` is MD5 of the
//! normalized workspace path. Two plain-text lines:
//!
//! ```text
//! 12345          ← holder pid (empty once released)
//! 1700000000     ← release time, epoch seconds (empty while held)
//! ```
//!
//! # Acquisition
//!
//! 1. `create_exclusive` with our pid. The file appears atomically with its
//!    contents (see [`RealFs`](crate::deps::RealFs)). Success here is the only real
//!    mutual-exclusion guarantee; everything else is recovery.
//! 2. Otherwise read the record. A live holder pid means busy. A release time
//!    younger than the cooldown means cooling down.
//! 3. Anything else is stale: dead holder, expired cooldown, or garbage content.
//!    Remove the file and retry the exclusive create exactly once.
//!
//! Two processes can both see the same stale record. Both remove it, one wins the
//! re-create, the other's create fails and it reports [`Acquisition::LostRace`].
//! One skipped validation cycle is the whole cost, so there is no attempt at full
//! linearizability.
//!
//! Probing never fails: every filesystem error folds into "not acquired". Only
//! [`LockManager::release`] reports an error.

use std::io;
use std::path::{Path, PathBuf};

use crate::deps::Dependencies;
use crate::error::{GateError, Result};

const LOCK_PREFIX: &str = "lintgate";

/// Outcome of [`LockManager::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    Acquired,
    /// Another live process holds the lock.
    Busy { holder: u32 },
    /// A run finished recently; `remaining_secs` until the lock is free again.
    CoolingDown { remaining_secs: i64 },
    /// The record was stale but another process re-created it first, or the
    /// filesystem refused one of the probe operations.
    LostRace,
}

impl Acquisition {
    pub fn is_acquired(self) -> bool {
        self == Acquisition::Acquired
    }
}

/// Parsed two-line lock record. Unparseable lines read as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct LockRecord {
    holder: Option<u32>,
    released_at: Option<i64>,
}

impl LockRecord {
    fn parse(content: &str) -> Self {
        let mut lines = content.split('\n').map(|l| l.trim_end_matches('\r'));
        let holder = lines.next().and_then(|l| l.trim().parse().ok());
        let released_at = lines.next().and_then(|l| l.trim().parse().ok());
        Self {
            holder,
            released_at,
        }
    }
}

/// Normalize a path for consistent hashing.
/// Strips trailing slashes except for root "/".
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn compute_lock_hash(workspace: &Path) -> String {
    let normalized = normalize_path(&workspace.to_string_lossy());
    format!("{:x}", md5::compute(normalized))
}

/// Path of the lock file for a workspace and hook, without touching the disk.
pub fn lock_file_path(temp_dir: &Path, workspace: &Path, hook_name: &str) -> PathBuf {
    temp_dir.join(format!(
        "{}-{}-{}.lock",
        LOCK_PREFIX,
        hook_name,
        compute_lock_hash(workspace)
    ))
}

/// Exclusive, stale-aware, cooldown-respecting lock keyed by (workspace, hook).
#[derive(Debug)]
pub struct LockManager {
    lock_file: PathBuf,
    pid: u32,
    cooldown_secs: i64,
    deps: Dependencies,
}

impl LockManager {
    pub fn new(workspace: &Path, hook_name: &str, cooldown_secs: u64, deps: Dependencies) -> Self {
        let lock_file = lock_file_path(&deps.fs.temp_dir(), workspace, hook_name);
        Self {
            lock_file,
            pid: deps.process.current_pid(),
            cooldown_secs: i64::try_from(cooldown_secs).unwrap_or(i64::MAX),
            deps,
        }
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    pub fn try_acquire(&self) -> Acquisition {
        let content = format!("{}\n", self.pid);

        match self.deps.fs.create_exclusive(&self.lock_file, content.as_bytes()) {
            Ok(()) => return Acquisition::Acquired,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                tracing::debug!(error = %err, path = %self.lock_file.display(), "Lock create failed");
                return Acquisition::LostRace;
            }
        }

        let existing = match self.deps.fs.read_to_string(&self.lock_file) {
            Ok(existing) => existing,
            Err(err) => {
                // Most likely released and removed between our create and read.
                tracing::debug!(error = %err, "Lock file unreadable");
                return Acquisition::LostRace;
            }
        };

        let record = LockRecord::parse(&existing);

        if let Some(holder) = record.holder {
            if self.deps.process.is_alive(holder) {
                return Acquisition::Busy { holder };
            }
        }

        if let Some(released_at) = record.released_at {
            let elapsed = self.deps.clock.now().timestamp() - released_at;
            if elapsed < self.cooldown_secs {
                return Acquisition::CoolingDown {
                    remaining_secs: self.cooldown_secs - elapsed,
                };
            }
        }

        tracing::debug!(
            path = %self.lock_file.display(),
            holder = ?record.holder,
            released_at = ?record.released_at,
            "Reclaiming stale lock"
        );

        if let Err(err) = self.deps.fs.remove(&self.lock_file) {
            tracing::debug!(error = %err, "Stale lock removal failed");
            return Acquisition::LostRace;
        }

        match self.deps.fs.create_exclusive(&self.lock_file, content.as_bytes()) {
            Ok(()) => Acquisition::Acquired,
            Err(_) => Acquisition::LostRace,
        }
    }

    /// Clears the holder and stamps the release time, starting the cooldown.
    /// The file is overwritten, never deleted.
    pub fn release(&self) -> Result<()> {
        let content = format!("\n{}\n", self.deps.clock.now().timestamp());
        self.deps
            .fs
            .write(&self.lock_file, content.as_bytes())
            .map_err(|source| GateError::LockRelease {
                path: self.lock_file.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::FileSystem;
    use crate::testing::{FakeProcess, FakeWorld};
    use std::sync::Arc;

    const T0: i64 = 1_700_000_000;

    fn manager(world: &FakeWorld, cooldown: u64) -> LockManager {
        LockManager::new(Path::new("/work/project"), "validate", cooldown, world.deps())
    }

    #[test]
    fn test_fresh_acquire_writes_pid_line() {
        let world = FakeWorld::new(4242, T0);
        let lock = manager(&world, 5);

        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
        assert_eq!(world.fs.contents(lock.lock_file()).unwrap(), "4242\n");
    }

    #[test]
    fn test_release_writes_empty_holder_and_timestamp() {
        let world = FakeWorld::new(4242, T0);
        let lock = manager(&world, 5);
        lock.try_acquire();

        lock.release().unwrap();

        assert_eq!(
            world.fs.contents(lock.lock_file()).unwrap(),
            format!("\n{}\n", T0)
        );
    }

    #[test]
    fn test_live_holder_means_busy() {
        let world = FakeWorld::new(1, T0);
        world.process.spawn(777);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "777\n");

        assert_eq!(lock.try_acquire(), Acquisition::Busy { holder: 777 });
    }

    #[test]
    fn test_dead_holder_is_reclaimed() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "99999\n");

        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
        assert_eq!(world.fs.contents(lock.lock_file()).unwrap(), "1\n");
    }

    #[test]
    fn test_cooldown_window() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        assert!(lock.try_acquire().is_acquired());
        lock.release().unwrap();

        world.clock.set(T0 + 3);
        assert_eq!(
            lock.try_acquire(),
            Acquisition::CoolingDown { remaining_secs: 2 }
        );

        world.clock.set(T0 + 6);
        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
    }

    #[test]
    fn test_cooldown_boundary_is_exclusive() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), &format!("\n{}\n", T0));

        world.clock.set(T0 + 5);
        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
    }

    #[test]
    fn test_zero_cooldown_reacquires_immediately() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 0);
        lock.try_acquire();
        lock.release().unwrap();

        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
    }

    #[test]
    fn test_malformed_content_is_stale() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "not-a-pid\nnot-a-time\n");

        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
    }

    #[test]
    fn test_empty_file_is_stale() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "");

        assert_eq!(lock.try_acquire(), Acquisition::Acquired);
    }

    #[test]
    fn test_crlf_record_is_understood() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), &format!("\r\n{}\r\n", T0 - 1));

        assert_eq!(
            lock.try_acquire(),
            Acquisition::CoolingDown { remaining_secs: 4 }
        );
    }

    #[test]
    fn test_read_failure_folds_into_not_acquired() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "99999\n");
        world.fs.fail_reads(true);

        assert_eq!(lock.try_acquire(), Acquisition::LostRace);
    }

    #[test]
    fn test_remove_failure_folds_into_not_acquired() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "99999\n");
        world.fs.fail_removes(true);

        assert_eq!(lock.try_acquire(), Acquisition::LostRace);
    }

    #[test]
    fn test_group_addressing_holder_pids_are_stale() {
        use crate::deps::SystemProcess;

        for holder in ["0\n", "4294967295\n"] {
            let world = FakeWorld::new(1, T0);
            let deps = Dependencies {
                process: Arc::new(SystemProcess),
                ..world.deps()
            };
            let lock = LockManager::new(Path::new("/work/project"), "validate", 5, deps);
            world.fs.add_file(lock.lock_file(), holder);

            assert_eq!(lock.try_acquire(), Acquisition::Acquired, "holder {:?}", holder);
        }
    }

    #[test]
    fn test_recreated_after_stale_removal_is_lost_race() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        world.fs.add_file(lock.lock_file(), "99999\n");
        world.fs.recreate_on_remove("555\n");

        assert_eq!(lock.try_acquire(), Acquisition::LostRace);
        assert_eq!(world.fs.contents(lock.lock_file()).unwrap(), "555\n");
    }

    #[test]
    fn test_holder_dying_mid_run_is_reclaimed() {
        let world = FakeWorld::new(100, T0);
        let other = Arc::new(FakeProcess::new(200));
        let first = manager(&world, 5);
        let second = LockManager::new(
            Path::new("/work/project"),
            "validate",
            5,
            world.deps_as(other.clone()),
        );

        assert!(first.try_acquire().is_acquired());
        other.spawn(100);
        assert_eq!(second.try_acquire(), Acquisition::Busy { holder: 100 });

        other.kill(100);
        assert_eq!(second.try_acquire(), Acquisition::Acquired);
        assert_eq!(world.fs.contents(second.lock_file()).unwrap(), "200\n");
    }

    #[test]
    fn test_release_failure_is_surfaced() {
        let world = FakeWorld::new(1, T0);
        let lock = manager(&world, 5);
        lock.try_acquire();
        world.fs.fail_writes(true);

        let err = lock.release().unwrap_err();
        assert!(matches!(err, GateError::LockRelease { .. }));
    }

    #[test]
    fn test_second_contender_is_refused_while_first_runs() {
        let world = FakeWorld::new(100, T0);
        let other = Arc::new(FakeProcess::new(200));
        other.spawn(100);

        let first = manager(&world, 5);
        let second = LockManager::new(
            Path::new("/work/project"),
            "validate",
            5,
            world.deps_as(other),
        );

        assert!(first.try_acquire().is_acquired());
        assert_eq!(second.try_acquire(), Acquisition::Busy { holder: 100 });
    }

    #[test]
    fn test_hook_name_and_workspace_isolate_locks() {
        let temp = Path::new("/tmp");
        let a = lock_file_path(temp, Path::new("/work/a"), "validate");
        let b = lock_file_path(temp, Path::new("/work/b"), "validate");
        let c = lock_file_path(temp, Path::new("/work/a"), "lint");
        let a_slash = lock_file_path(temp, Path::new("/work/a/"), "validate");

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a_slash);
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("lintgate-validate-"));
    }

    #[test]
    fn test_real_fs_contenders_get_exactly_one_acquisition() {
        use crate::deps::{RealFs, SystemClock};
        use std::sync::Barrier;

        struct TempFs(PathBuf);
        impl FileSystem for TempFs {
            fn stat(&self, path: &Path) -> io::Result<crate::deps::FileStat> {
                RealFs.stat(path)
            }
            fn read_to_string(&self, path: &Path) -> io::Result<String> {
                RealFs.read_to_string(path)
            }
            fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
                RealFs.write(path, contents)
            }
            fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
                RealFs.create_exclusive(path, contents)
            }
            fn remove(&self, path: &Path) -> io::Result<()> {
                RealFs.remove(path)
            }
            fn temp_dir(&self) -> PathBuf {
                self.0.clone()
            }
        }

        let temp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new(1, T0);
        let contenders = 8u32;
        let barrier = Arc::new(Barrier::new(contenders as usize));

        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                let process = Arc::new(FakeProcess::new(1000 + i));
                for pid in 1000..1000 + contenders {
                    process.spawn(pid);
                }
                let deps = Dependencies {
                    clock: Arc::new(SystemClock),
                    process,
                    fs: Arc::new(TempFs(temp.path().to_path_buf())),
                    runner: world.runner.clone(),
                };
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let lock = LockManager::new(Path::new("/work/project"), "validate", 5, deps);
                    barrier.wait();
                    lock.try_acquire().is_acquired()
                })
            })
            .collect();

        let acquired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(acquired, 1);
    }
}
