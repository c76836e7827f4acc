//! Interfaces the editor host provides, plus the terminal implementations the
//! `custom-formatters` binary runs with.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Action offered on formatter failures; selecting it reveals the output channel.
pub const SHOW_OUTPUT: &str = "Show output";

/// User-facing notifications.
pub trait Notifier: Send + Sync {
    /// Show an error with optional actions. Returns the action the user picked.
    fn show_error(&self, message: &str, actions: &[&'static str]) -> Option<&'static str>;

    fn show_warning(&self, message: &str);
}

/// Append-only log the user can open for troubleshooting.
pub trait OutputChannel: Send + Sync {
    fn append_line(&self, line: &str);

    /// Bring the channel into view.
    fn show(&self);
}

/// Prints notifications to stderr. Never selects an action.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn show_error(&self, message: &str, _actions: &[&'static str]) -> Option<&'static str> {
        tracing::error!("{message}");
        eprintln!("error: {message}");
        None
    }

    fn show_warning(&self, message: &str) {
        tracing::warn!("{message}");
        eprintln!("warning: {message}");
    }
}

/// Output channel kept in memory and mirrored to the log file.
#[derive(Debug)]
pub struct LogChannel {
    name: String,
    lines: Mutex<Vec<String>>,
}

impl LogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.locked().clone()
    }

    /// Everything appended so far, one entry per line.
    pub fn contents(&self) -> String {
        self.locked().join("\n")
    }

    fn locked(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputChannel for LogChannel {
    fn append_line(&self, line: &str) {
        tracing::info!(channel = %self.name, "{line}");
        self.locked().push(line.to_string());
    }

    fn show(&self) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "--- {} ---", self.name);
        for line in self.locked().iter() {
            let _ = writeln!(stderr, "{line}");
        }
    }
}
