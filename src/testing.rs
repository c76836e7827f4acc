use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::host::{Notifier, OutputChannel};

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    pub choose: Option<&'static str>,
}

impl RecordingNotifier {
    pub fn choosing(action: &'static str) -> Self {
        Self {
            choose: Some(action),
            ..Self::default()
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show_error(&self, message: &str, actions: &[&'static str]) -> Option<&'static str> {
        self.errors.lock().unwrap().push(message.to_string());
        self.choose.filter(|choice| actions.contains(choice))
    }

    fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

#[derive(Debug, Default)]
pub struct RecordingChannel {
    lines: Mutex<Vec<String>>,
    shown: AtomicUsize,
}

impl RecordingChannel {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl OutputChannel for RecordingChannel {
    fn append_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }
}
