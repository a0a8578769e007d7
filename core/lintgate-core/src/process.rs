//! Process inspection and the real command runner.
//!
//! ## Output draining
//!
//! stdout and stderr are drained by two reader threads that make progress
//! independently. Reading one pipe to EOF before touching the other deadlocks as
//! soon as the child fills the pipe buffer of the stream nobody is reading.
//!
//! ## Timeouts
//!
//! The child is spawned as the leader of a new process group. When the deadline
//! elapses the whole group gets SIGKILL (so `make` takes its recipe shells down with
//! it) and the child is reaped before the run is reported as [`Exit::TimedOut`].

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::deps::{CommandRunner, CommandSpec, Exit, ProcessOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long readers get to hit EOF once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const READ_CHUNK_SIZE: usize = 8192;

pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // 0 and negative pids address process groups, not a single process.
        let pid = match i32::try_from(pid) {
            Ok(pid) if pid > 0 => pid,
            _ => return false,
        };
        // SAFETY: kill with signal 0 performs only the existence/permission check.
        unsafe { libc::kill(pid, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Runs commands with `std::process`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> ProcessOutput {
        run_with_deadline(spec, timeout)
    }

    fn look_path(&self, program: &str) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable_file(candidate))
    }
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// `./scripts/lint` is relative to the command's working directory, not ours.
fn program_path(spec: &CommandSpec) -> PathBuf {
    let program = Path::new(&spec.program);
    if program.is_relative() && program.components().count() > 1 {
        spec.dir.join(program)
    } else {
        program.to_path_buf()
    }
}

fn run_with_deadline(spec: &CommandSpec, timeout: Duration) -> ProcessOutput {
    let mut command = Command::new(program_path(spec));
    command
        .args(&spec.args)
        .current_dir(&spec.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            return ProcessOutput {
                exit: Exit::LaunchFailed(format!("start command {}: {}", spec.program, err)),
                stdout: Vec::new(),
                stderr: Vec::new(),
            };
        }
    };

    let stdout = StreamDrain::spawn(child.stdout.take());
    let stderr = StreamDrain::spawn(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let exit = wait_until(&mut child, deadline);

    // After a normal exit the readers may still be flushing what the child wrote
    // last. Give them until the deadline (or a short grace) to reach EOF.
    let drain_deadline = match exit {
        Exit::TimedOut => Instant::now() + DRAIN_GRACE,
        _ => deadline.max(Instant::now() + DRAIN_GRACE),
    };

    ProcessOutput {
        exit,
        stdout: stdout.finish(drain_deadline),
        stderr: stderr.finish(drain_deadline),
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> Exit {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return match status.code() {
                    Some(code) => Exit::Code(code),
                    None => Exit::Signaled,
                };
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    kill_tree(child);
                    return Exit::TimedOut;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                kill_tree(child);
                return Exit::LaunchFailed(format!("wait for command: {}", err));
            }
        }
    }
}

fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        // SAFETY: the child was spawned with process_group(0), so its pid is also
        // the id of a group that contains only it and its descendants.
        unsafe {
            libc::killpg(child.id() as i32, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// One pipe being read on its own thread.
struct StreamDrain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Option<Receiver<()>>,
}

impl StreamDrain {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let Some(mut pipe) = pipe else {
            return Self { buffer, done: None };
        };

        let (tx, rx) = mpsc::channel();
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });

        Self {
            buffer,
            done: Some(rx),
        }
    }

    /// Waits for EOF until `deadline`, then returns whatever was captured.
    fn finish(self, deadline: Instant) -> Vec<u8> {
        if let Some(done) = self.done {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if done.recv_timeout(remaining).is_err() {
                tracing::debug!("Output reader did not reach EOF before deadline");
            }
        }
        match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
