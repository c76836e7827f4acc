use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::FormatError;

/// Why a formatter process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Code(i32),
    Signal(i32),
    /// Neither an exit code nor a signal was reported.
    Unknown,
}

impl ExitReason {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitReason::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitReason::Signal(signal);
            }
        }

        ExitReason::Unknown
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitReason::Code(0))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Code(code) => write!(f, "exited with code {code}"),
            // A hint only: nothing here enforces a timeout.
            ExitReason::Signal(signal) => write!(
                f,
                "terminated by signal {} (likely due to a timeout or external termination)",
                signal_name(*signal)
            ),
            ExitReason::Unknown => write!(f, "exited without a status"),
        }
    }
}

/// Conventional name for the signals that share a number across Unix flavors.
pub fn signal_name(signal: i32) -> String {
    let name = match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        8 => "SIGFPE",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        other => return format!("signal {other}"),
    };
    name.to_string()
}

/// Everything a finished formatter process produced.
#[derive(Debug, Clone)]
pub struct Completed {
    pub reason: ExitReason,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// A formatter process started through the platform shell.
///
/// Stdin is fed on its own thread and closed once the input is written;
/// stdout and stderr are drained by independent reader threads until
/// end-of-stream.
pub struct Invocation {
    child: Child,
    started_at: Instant,
    writer: Option<JoinHandle<()>>,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl Invocation {
    pub fn start(command: &str, cwd: Option<&Path>, input: String) -> Result<Self, FormatError> {
        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let started_at = Instant::now();
        let mut child = cmd.spawn().map_err(|source| FormatError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let writer = child.stdin.take().map(|stdin| spawn_writer(stdin, input));
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        Ok(Self {
            child,
            started_at,
            writer,
            stdout,
            stderr,
        })
    }

    /// Block until the process exits and both output streams are drained.
    pub fn wait(mut self) -> Result<Completed, FormatError> {
        let status = self.child.wait().map_err(|err| {
            tracing::error!("failed waiting for formatter: {err}");
            FormatError::Disconnected
        })?;

        if let Some(writer) = self.writer.take()
            && writer.join().is_err()
        {
            tracing::warn!("formatter stdin writer panicked; input may be incomplete");
        }
        let stdout = join_reader(self.stdout.take());
        let stderr = join_reader(self.stderr.take());

        Ok(Completed {
            reason: ExitReason::from_status(status),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration: self.started_at.elapsed(),
        })
    }
}

/// Run `command` through the platform shell: `/bin/sh -c`, or `cmd /C` on
/// Windows. Same default as a Node `spawn` with `shell: true`, so pipes,
/// quoting and `&&` in templates behave as users expect from other editors.
fn shell_command(command: &str) -> Command {
    let (shell, flag) = if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("/bin/sh", "-c")
    };
    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command);
    cmd
}

fn spawn_writer(mut stdin: ChildStdin, input: String) -> JoinHandle<()> {
    thread::spawn(move || {
        // Dropping stdin at the end closes the pipe and signals end-of-input.
        if let Err(err) = stdin.write_all(input.as_bytes()) {
            if err.kind() == ErrorKind::BrokenPipe {
                tracing::debug!("formatter closed stdin before reading all input");
            } else {
                tracing::warn!("failed writing formatter stdin: {err}");
            }
        }
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!("failed reading formatter output: {err}");
                    break;
                }
            }
        }
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle.map(JoinHandle::join) {
        Some(Ok(buf)) => buf,
        Some(Err(_)) => {
            tracing::warn!("formatter output reader panicked; output dropped");
            Vec::new()
        }
        None => Vec::new(),
    }
}
