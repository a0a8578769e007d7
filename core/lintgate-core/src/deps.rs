//! Collaborator traits injected into every component.
//!
//! The lock manager, discovery walk and executor never touch the clock, the process
//! table, the filesystem or `std::process` directly. They go through a
//! [`Dependencies`] bundle so tests can simulate time, dead holders and missing
//! binaries without sleeping or spawning anything.
//!
//! Every trait is `Send + Sync`: the lint and test validations run on two threads
//! that share one bundle.

use chrono::{DateTime, Utc};
use fs_err as fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::process::{is_pid_alive, SystemRunner};

/// Wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Process table inspection.
pub trait ProcessProbe: Send + Sync {
    fn current_pid(&self) -> u32;
    fn is_alive(&self, pid: u32) -> bool;
}

/// The subset of file metadata the core looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStat {
    pub is_dir: bool,
    /// Any of the owner/group/other execute bits is set.
    pub executable: bool,
}

/// Filesystem access used by the lock manager and discovery.
pub trait FileSystem: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<FileStat>;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    /// Creates or truncates `path`.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    /// Creates `path` only if it does not exist yet. Fails with
    /// [`io::ErrorKind::AlreadyExists`] otherwise.
    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn temp_dir(&self) -> PathBuf;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }
}

/// A command line to launch in a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I, dir: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.to_path_buf(),
        }
    }
}

/// How a launched command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Code(i32),
    /// Terminated by a signal without an exit code.
    Signaled,
    /// Still running when the deadline elapsed (and was killed).
    TimedOut,
    /// Never started: binary missing, bad working directory, etc.
    LaunchFailed(String),
}

/// Captured result of one command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit: Exit,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit == Exit::Code(0)
    }
}

/// Launches external commands.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> ProcessOutput;
    /// Resolves `program` against `PATH`.
    fn look_path(&self, program: &str) -> Option<PathBuf>;
}

/// Everything the core needs from the outside world.
#[derive(Clone)]
pub struct Dependencies {
    pub clock: Arc<dyn Clock>,
    pub process: Arc<dyn ProcessProbe>,
    pub fs: Arc<dyn FileSystem>,
    pub runner: Arc<dyn CommandRunner>,
}

impl Dependencies {
    /// Production bundle backed by the real clock, process table, disk and `PATH`.
    pub fn system() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            process: Arc::new(SystemProcess),
            fs: Arc::new(RealFs),
            runner: Arc::new(SystemRunner),
        }
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies").finish_non_exhaustive()
    }
}

// =============================================================================
// Production implementations
// =============================================================================

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct SystemProcess;

impl ProcessProbe for SystemProcess {
    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn is_alive(&self, pid: u32) -> bool {
        is_pid_alive(pid)
    }
}

pub struct RealFs;

const LOCK_FILE_MODE: u32 = 0o600;

impl FileSystem for RealFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        #[cfg(unix)]
        let executable = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o111 != 0
        };
        #[cfg(not(unix))]
        let executable = meta.is_file();
        Ok(FileStat {
            is_dir: meta.is_dir(),
            executable,
        })
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    /// Writes the contents to a private temp file first and then hard-links it into
    /// place. `link` fails if the target exists, and the target never exists
    /// without its contents, so a contender can't read a half-written record.
    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        use std::io::Write as _;

        let staging = staging_path(path);
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(LOCK_FILE_MODE);
        }
        let written = options
            .open(&staging)
            .and_then(|mut file| file.write_all(contents));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&staging);
            // AlreadyExists is reserved for the lock path itself.
            if err.kind() == io::ErrorKind::AlreadyExists {
                return Err(io::Error::other(err));
            }
            return Err(err);
        }

        let linked = std::fs::hard_link(&staging, path);
        let _ = std::fs::remove_file(&staging);
        linked
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEQ: AtomicU64 = AtomicU64::new(0);

    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        seq
    ))
}
