//! Shell process management.
//!
//! A [`Launcher`] turns an [`Invocation`] into a running [`ShellProcess`].
//! The system launcher spawns a real child with stdin piped and stderr folded
//! into stdout; tests substitute in-memory processes.
//!
//! One round-trip consumes a process: the batch is written, stdin is closed,
//! and everything the shell prints is collected until it exits.

use std::collections::HashMap;
use std::io::{self, PipeReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use plusql_core::error::{ConnectionError, ConnectionErrorKind};
use plusql_core::{Error, Result};

/// Poll interval while waiting for a child to exit against a deadline.
const WAIT_POLL: Duration = Duration::from_millis(5);

/// Everything needed to start a shell.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Complete child environment; nothing is inherited.
    pub env: HashMap<String, String>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The last argument carries the password.
        let shown = self.args.len().saturating_sub(1);
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &&self.args[..shown])
            .field("env_vars", &self.env.len())
            .finish_non_exhaustive()
    }
}

/// What a finished round-trip produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    /// Empty for the system launcher, which folds stderr into stdout.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Did the shell exit with status 0?
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// A running shell that accepts one statement batch.
pub trait ShellProcess {
    /// Can this process still accept a batch?
    fn is_alive(&mut self) -> bool;

    /// Send `input`, close stdin and collect output until the process exits.
    ///
    /// Exceeding `timeout` returns [`Error::Timeout`] and leaves the process
    /// as it is.
    fn round_trip(&mut self, input: &[u8], timeout: Option<Duration>) -> Result<ProcessOutput>;

    /// Ask the process to stop. Stopping an exited process is not an error.
    fn terminate(&mut self) -> io::Result<()>;

    /// OS process id, if there is one.
    fn id(&self) -> Option<u32> {
        None
    }
}

/// Starts shell processes.
pub trait Launcher {
    type Process: ShellProcess;

    fn launch(&self, invocation: &Invocation) -> io::Result<Self::Process>;
}

/// Launches real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    type Process = ChildProcess;

    fn launch(&self, invocation: &Invocation) -> io::Result<ChildProcess> {
        ChildProcess::spawn(invocation)
    }
}

/// A shell running as an OS child process.
///
/// Dropping it kills the child if it is still running.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    output: Option<PipeReader>,
}

impl ChildProcess {
    /// Spawn the shell with stdin piped and stderr merged into stdout.
    pub fn spawn(invocation: &Invocation) -> io::Result<Self> {
        let (output, writer) = io::pipe()?;

        // The command holds the parent's copies of the write end; it must be
        // dropped before reading or EOF never arrives.
        let mut child = {
            let mut command = Command::new(&invocation.program);
            command
                .args(&invocation.args)
                .env_clear()
                .envs(&invocation.env)
                .stdin(Stdio::piped())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            command.spawn()?
        };

        let stdin = child.stdin.take();
        tracing::debug!(pid = child.id(), program = %invocation.program.display(), "Spawned shell");
        Ok(Self {
            child,
            stdin,
            output: Some(output),
        })
    }

    fn wait_until(&mut self, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
        let Some(deadline) = deadline else {
            return self.child.wait().map(Some);
        };
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

impl ShellProcess for ChildProcess {
    fn is_alive(&mut self) -> bool {
        self.stdin.is_some() && matches!(self.child.try_wait(), Ok(None))
    }

    fn round_trip(&mut self, input: &[u8], timeout: Option<Duration>) -> Result<ProcessOutput> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let stdin = self
            .stdin
            .take()
            .ok_or_else(|| disconnected("shell stdin already closed", None))?;
        let output = self
            .output
            .take()
            .ok_or_else(|| disconnected("shell output already consumed", None))?;

        let writer = spawn_writer(stdin, input.to_vec());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = output;
            let mut buf = Vec::new();
            let read = output.read_to_end(&mut buf).map(|_| buf);
            // The receiver is gone after a timeout.
            let _ = tx.send(read);
        });

        let received = match (timeout, deadline) {
            (Some(timeout), Some(deadline)) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                rx.recv_timeout(remaining)
                    .map_err(|_| Error::Timeout(timeout))?
            }
            _ => rx
                .recv()
                .map_err(|e| disconnected("shell output reader vanished", Some(Box::new(e))))?,
        };
        let stdout =
            received.map_err(|e| disconnected("failed to read shell output", Some(Box::new(e))))?;

        let status = self
            .wait_until(deadline)
            .map_err(|e| disconnected("failed to wait for shell", Some(Box::new(e))))?
            .ok_or_else(|| Error::Timeout(timeout.unwrap_or_default()))?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(disconnected(
                    "failed to write statement to shell",
                    Some(Box::new(e)),
                ));
            }
            Err(_) => return Err(disconnected("shell writer thread panicked", None)),
        }

        Ok(ProcessOutput {
            status: status.code(),
            stdout,
            stderr: Vec::new(),
        })
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.stdin = None;
        match self.child.try_wait()? {
            Some(_) => Ok(()),
            None => {
                self.child.kill()?;
                self.child.wait().map(|_| ())
            }
        }
    }

    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Write the batch and close stdin. A shell that exits before reading
/// everything (a failed login, say) closes the pipe early; its output explains
/// why, so a broken pipe is not an error here.
fn spawn_writer(mut stdin: ChildStdin, input: Vec<u8>) -> JoinHandle<io::Result<()>> {
    thread::spawn(move || {
        let written = stdin.write_all(&input).and_then(|()| stdin.flush());
        drop(stdin);
        match written {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    })
}

fn disconnected(
    message: &str,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Disconnected,
        message: message.to_string(),
        source,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            env: HashMap::new(),
        }
    }

    #[test]
    fn test_round_trip_echoes_stdin() {
        let mut process = ChildProcess::spawn(&sh("cat")).unwrap();
        assert!(process.is_alive());
        let output = process.round_trip(b"select 1;", None).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, b"select 1;");
        assert!(!process.is_alive());
    }

    #[test]
    fn test_stderr_is_merged() {
        let mut process =
            ChildProcess::spawn(&sh("cat >/dev/null; echo out; echo err >&2; exit 3")).unwrap();
        let output = process.round_trip(b"", Some(Duration::from_secs(10))).unwrap();
        assert_eq!(output.status, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, b"out\nerr\n");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_environment_is_explicit() {
        let mut invocation = sh("printf '%s' \"$NLS_LANG\"");
        invocation
            .env
            .insert("NLS_LANG".to_string(), "American_America.AL32UTF8".to_string());
        let mut process = ChildProcess::spawn(&invocation).unwrap();
        let output = process.round_trip(b"", None).unwrap();
        assert_eq!(output.stdout, b"American_America.AL32UTF8");
    }

    #[test]
    fn test_timeout_leaves_process_unusable() {
        let mut process = ChildProcess::spawn(&sh("exec sleep 10")).unwrap();
        let err = process
            .round_trip(b"select 1;", Some(Duration::from_millis(100)))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(100)));
        assert!(!process.is_alive());
        process.terminate().unwrap();
        process.terminate().unwrap();
    }

    fn pid_exists(pid: u32) -> bool {
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stderr(Stdio::null())
            .status()
            .unwrap()
            .success()
    }

    #[test]
    fn test_drop_kills_running_child() {
        let process = ChildProcess::spawn(&sh("exec sleep 30")).unwrap();
        let pid = process.id().unwrap();
        assert!(pid_exists(pid));
        drop(process);
        assert!(!pid_exists(pid));
    }

    #[test]
    fn test_drop_after_timeout_kills_child() {
        let mut process = ChildProcess::spawn(&sh("exec sleep 30")).unwrap();
        let pid = process.id().unwrap();
        let err = process
            .round_trip(b"select 1;", Some(Duration::from_millis(50)))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(pid_exists(pid));
        drop(process);
        assert!(!pid_exists(pid));
    }

    #[test]
    fn test_second_round_trip_is_disconnected() {
        let mut process = ChildProcess::spawn(&sh("cat")).unwrap();
        process.round_trip(b"x", None).unwrap();
        let err = process.round_trip(b"y", None).unwrap_err();
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_spawn_failure() {
        let invocation = Invocation {
            program: PathBuf::from("/nonexistent/sqlplus"),
            args: Vec::new(),
            env: HashMap::new(),
        };
        let err = ChildProcess::spawn(&invocation).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_invocation_debug_hides_connect_argument() {
        let invocation = Invocation {
            program: PathBuf::from("sqlplus"),
            args: vec!["-S".to_string(), "scott/tiger@db".to_string()],
            env: HashMap::new(),
        };
        let debug = format!("{invocation:?}");
        assert!(debug.contains("-S"));
        assert!(!debug.contains("tiger"));
    }
}
