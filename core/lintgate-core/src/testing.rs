//! In-memory fakes for the [`Dependencies`] traits.
//!
//! Compiled for unit tests and, behind the `test-helpers` feature, for the
//! integration tests under `tests/`.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::deps::{
    Clock, CommandRunner, CommandSpec, Dependencies, Exit, FileStat, FileSystem, ProcessOutput,
    ProcessProbe,
};

/// Clock pinned to an epoch second that tests move explicitly.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn at(epoch_secs: i64) -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(epoch_secs, 0).unwrap()),
        }
    }

    pub fn set(&self, epoch_secs: i64) {
        *self.now.lock().unwrap() = Utc.timestamp_opt(epoch_secs, 0).unwrap();
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Process table with an explicit set of live pids.
pub struct FakeProcess {
    pid: u32,
    alive: Mutex<BTreeSet<u32>>,
}

impl FakeProcess {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            alive: Mutex::new(BTreeSet::from([pid])),
        }
    }

    pub fn spawn(&self, pid: u32) {
        self.alive.lock().unwrap().insert(pid);
    }

    pub fn kill(&self, pid: u32) {
        self.alive.lock().unwrap().remove(&pid);
    }
}

impl ProcessProbe for FakeProcess {
    fn current_pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}

#[derive(Debug, Clone, Default)]
struct MemFile {
    contents: Vec<u8>,
    executable: bool,
}

/// Flat in-memory filesystem. Parent directories are implied by file paths and can
/// also be added explicitly.
#[derive(Default)]
pub struct MemFs {
    files: Mutex<BTreeMap<PathBuf, MemFile>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    fail_writes: Mutex<bool>,
    fail_reads: Mutex<bool>,
    fail_removes: Mutex<bool>,
    recreate_on_remove: Mutex<Option<Vec<u8>>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str) {
        self.files.lock().unwrap().insert(
            path.as_ref().to_path_buf(),
            MemFile {
                contents: contents.as_bytes().to_vec(),
                executable: false,
            },
        );
    }

    pub fn add_executable(&self, path: impl AsRef<Path>, contents: &str) {
        self.files.lock().unwrap().insert(
            path.as_ref().to_path_buf(),
            MemFile {
                contents: contents.as_bytes().to_vec(),
                executable: true,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.dirs.lock().unwrap().insert(path.as_ref().to_path_buf());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|f| String::from_utf8_lossy(&f.contents).into_owned())
    }

    /// The next successful `remove` is immediately followed by another writer
    /// re-creating the file with `contents`.
    pub fn recreate_on_remove(&self, contents: &str) {
        *self.recreate_on_remove.lock().unwrap() = Some(contents.as_bytes().to_vec());
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_removes(&self, fail: bool) {
        *self.fail_removes.lock().unwrap() = fail;
    }

    fn is_implied_dir(&self, path: &Path) -> bool {
        if self.dirs.lock().unwrap().contains(path) {
            return true;
        }
        self.files
            .lock()
            .unwrap()
            .keys()
            .any(|file| file.starts_with(path) && file != path)
    }
}

fn injected(kind: io::ErrorKind) -> io::Error {
    io::Error::new(kind, "injected failure")
}

impl FileSystem for MemFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        if let Some(file) = self.files.lock().unwrap().get(path) {
            return Ok(FileStat {
                is_dir: false,
                executable: file.executable,
            });
        }
        if self.is_implied_dir(path) {
            return Ok(FileStat {
                is_dir: true,
                executable: true,
            });
        }
        Err(io::Error::from(io::ErrorKind::NotFound))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if *self.fail_reads.lock().unwrap() {
            return Err(injected(io::ErrorKind::PermissionDenied));
        }
        self.contents(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(injected(io::ErrorKind::PermissionDenied));
        }
        let mut files = self.files.lock().unwrap();
        let entry = files.entry(path.to_path_buf()).or_default();
        entry.contents = contents.to_vec();
        Ok(())
    }

    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(injected(io::ErrorKind::PermissionDenied));
        }
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        files.insert(
            path.to_path_buf(),
            MemFile {
                contents: contents.to_vec(),
                executable: false,
            },
        );
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if *self.fail_removes.lock().unwrap() {
            return Err(injected(io::ErrorKind::PermissionDenied));
        }
        let mut files = self.files.lock().unwrap();
        if files.remove(path).is_none() {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if let Some(contents) = self.recreate_on_remove.lock().unwrap().take() {
            files.insert(
                path.to_path_buf(),
                MemFile {
                    contents,
                    executable: false,
                },
            );
        }
        Ok(())
    }

    fn temp_dir(&self) -> PathBuf {
        PathBuf::from("/tmp")
    }
}

/// Runner that answers from a table of canned outputs and records every call.
///
/// Unknown commands exit 1, like a `make -n` for a missing target would.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<(String, Vec<String>), ProcessOutput>>,
    on_path: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<CommandSpec>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, program: &str, args: &[&str], output: ProcessOutput) {
        self.responses.lock().unwrap().insert(
            (
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            ),
            output,
        );
    }

    pub fn succeed(&self, program: &str, args: &[&str]) {
        self.respond(program, args, exited(0, "", ""));
    }

    pub fn fail(&self, program: &str, args: &[&str], code: i32) {
        self.respond(program, args, exited(code, "", "failed"));
    }

    pub fn put_on_path(&self, program: &str) {
        self.on_path.lock().unwrap().insert(program.to_string());
    }

    /// Every `run` sleeps this long first, to let tests observe concurrency.
    pub fn delay_each_run(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ran(&self, program: &str, args: &[&str]) -> bool {
        self.calls()
            .iter()
            .any(|c| c.program == program && c.args == args)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec, _timeout: Duration) -> ProcessOutput {
        self.calls.lock().unwrap().push(spec.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.responses
            .lock()
            .unwrap()
            .get(&(spec.program.clone(), spec.args.clone()))
            .cloned()
            .unwrap_or_else(|| exited(1, "", "no such target"))
    }

    fn look_path(&self, program: &str) -> Option<PathBuf> {
        self.on_path
            .lock()
            .unwrap()
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// Output of a command that ran to completion.
pub fn exited(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        exit: Exit::Code(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Output of a command that hit its deadline.
pub fn timed_out(stdout: &str) -> ProcessOutput {
    ProcessOutput {
        exit: Exit::TimedOut,
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// A fully faked bundle plus handles to each fake.
pub struct FakeWorld {
    pub clock: Arc<FakeClock>,
    pub process: Arc<FakeProcess>,
    pub fs: Arc<MemFs>,
    pub runner: Arc<ScriptedRunner>,
}

impl FakeWorld {
    pub fn new(pid: u32, epoch_secs: i64) -> Self {
        Self {
            clock: Arc::new(FakeClock::at(epoch_secs)),
            process: Arc::new(FakeProcess::new(pid)),
            fs: Arc::new(MemFs::new()),
            runner: Arc::new(ScriptedRunner::new()),
        }
    }

    pub fn deps(&self) -> Dependencies {
        Dependencies {
            clock: self.clock.clone(),
            process: self.process.clone(),
            fs: self.fs.clone(),
            runner: self.runner.clone(),
        }
    }

    /// Same disk and clock, different process (for two-contender lock tests).
    pub fn deps_as(&self, process: Arc<FakeProcess>) -> Dependencies {
        Dependencies {
            process,
            ..self.deps()
        }
    }
}
