use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::error::FormatError;
use crate::formatter::process::{Completed, Invocation};
use crate::formatter::template::{self, TemplateContext};
use crate::host::{Notifier, OutputChannel, SHOW_OUTPUT};
use crate::model::document::{Document, FormattingOptions, Range, TextEdit};
use crate::model::workspace::Workspace;

/// Zero edits (nothing to apply) or one whole-document replacement.
pub type Edits = SmallVec<[TextEdit; 1]>;

/// Document formatting handler bound to one resolved command template.
#[derive(Clone)]
pub struct FormatProvider {
    template: String,
    channel: Arc<dyn OutputChannel>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for FormatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatProvider")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl FormatProvider {
    pub fn new(
        template: impl Into<String>,
        channel: Arc<dyn OutputChannel>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            template: template.into(),
            channel,
            notifier,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Start the formatter on `document`. Text and range are captured now, so
    /// edits made to the document afterwards do not move the replacement.
    pub fn provide_edits(
        &self,
        document: &Document,
        options: FormattingOptions,
        workspace: &Workspace,
    ) -> PendingFormat {
        let file = document.path().display().to_string();
        let relative = workspace.relative_path(document.path());
        let command = template::render(
            &self.template,
            &TemplateContext {
                file: &file,
                file_relative_to_workspace: &relative,
                options,
            },
        );
        let cwd = workspace.working_dir(document.path());

        let input = document.text();
        let target = document.full_range();
        let input_empty = input.is_empty();

        self.channel
            .append_line(&format!("Started formatter: {command}"));
        tracing::info!(command = %command, cwd = ?cwd, "formatter started");

        let invocation = match Invocation::start(&command, cwd, input) {
            Ok(invocation) => invocation,
            Err(err) => {
                let message = format!("Formatter failed to start: {command}\nReason: {err}");
                self.report_failure(&message);
                return PendingFormat::ready(Err(err));
            }
        };

        let (tx, rx) = mpsc::channel();
        let provider = self.clone();
        thread::spawn(move || {
            let result = invocation
                .wait()
                .and_then(|done| provider.finish(&command, done, input_empty, target));
            let _ = tx.send(result);
        });

        PendingFormat { rx }
    }

    fn finish(
        &self,
        command: &str,
        done: Completed,
        input_empty: bool,
        target: Range,
    ) -> Result<Edits, FormatError> {
        let millis = done.duration.as_millis();

        if !done.reason.success() {
            let message = format!(
                "Formatter failed in {millis}ms: {command}\nReason: {}",
                done.reason
            );
            self.channel.append_line(&message);
            if !done.stderr.is_empty() {
                self.channel
                    .append_line(&format!("Stderr:\n{}", done.stderr));
            }
            if !done.stdout.is_empty() {
                self.channel
                    .append_line(&format!("Stdout:\n{}", done.stdout));
            }
            tracing::warn!(command, reason = %done.reason, "formatter failed");
            self.report_failure(&message);
            return Err(FormatError::Failed(message));
        }

        if !input_empty && done.stdout.is_empty() {
            self.channel.append_line(&format!(
                "Formatter returned nothing in {millis}ms - not applying changes."
            ));
            tracing::info!(command, "formatter returned no output");
            return Ok(SmallVec::new());
        }

        self.channel.append_line(&format!(
            "Finished running formatter in {millis}ms: {command}"
        ));
        if !done.stderr.is_empty() {
            self.channel
                .append_line(&format!("Possible issues occurred:\n{}", done.stderr));
        }
        tracing::info!(command, millis = millis as u64, "formatter finished");

        Ok(smallvec![TextEdit::replace(target, done.stdout)])
    }

    fn report_failure(&self, message: &str) {
        if self.notifier.show_error(message, &[SHOW_OUTPUT]) == Some(SHOW_OUTPUT) {
            self.channel.show();
        }
    }
}

/// Result of a formatter run that may still be in flight.
#[derive(Debug)]
pub struct PendingFormat {
    rx: Receiver<Result<Edits, FormatError>>,
}

impl PendingFormat {
    fn ready(result: Result<Edits, FormatError>) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block until the formatter finishes.
    pub fn wait(self) -> Result<Edits, FormatError> {
        self.rx.recv().map_err(|_| FormatError::Disconnected)?
    }

    /// Non-blocking poll; `None` while the formatter is still running.
    pub fn try_wait(&self) -> Option<Result<Edits, FormatError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FormatError::Disconnected)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::document::Position;
    use crate::testing::{RecordingChannel, RecordingNotifier};
    use std::path::PathBuf;

    struct Harness {
        channel: Arc<RecordingChannel>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_notifier(RecordingNotifier::default())
        }

        fn with_notifier(notifier: RecordingNotifier) -> Self {
            Self {
                channel: Arc::new(RecordingChannel::default()),
                notifier: Arc::new(notifier),
            }
        }

        fn provider(&self, template: &str) -> FormatProvider {
            FormatProvider::new(template, self.channel.clone(), self.notifier.clone())
        }

        fn format(&self, template: &str, text: &str) -> Result<Edits, FormatError> {
            let doc = Document::new("/tmp/sample.txt", "plaintext", text);
            self.provider(template)
                .provide_edits(&doc, FormattingOptions::default(), &Workspace::default())
                .wait()
        }

        fn log(&self) -> String {
            self.channel.lines().join("\n")
        }
    }

    #[test]
    fn echoing_formatter_replaces_whole_document() {
        let harness = Harness::new();
        let edits = harness.format("cat", "abc\ndef\n").unwrap();

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "abc\ndef\n");
        assert_eq!(
            edits[0].range,
            Range::new(Position::new(0, 0), Position::new(2, 0))
        );
        assert!(harness.log().contains("Started formatter: cat"));
        assert!(harness.log().contains("Finished running formatter in"));
        assert!(harness.notifier.errors().is_empty());
    }

    #[test]
    fn empty_output_is_a_no_op() {
        let harness = Harness::new();
        let edits = harness.format("true", "keep me\n").unwrap();

        assert!(edits.is_empty());
        assert!(harness.log().contains("Formatter returned nothing in"));
        assert!(harness.log().contains("not applying changes."));
    }

    #[test]
    fn empty_input_accepts_empty_output() {
        let harness = Harness::new();
        let edits = harness.format("true", "").unwrap();

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "");
    }

    #[test]
    fn nonzero_exit_fails_with_details() {
        let harness = Harness::new();
        let err = harness
            .format("echo partial; echo broken >&2; exit 2", "x\n")
            .unwrap_err();

        let FormatError::Failed(message) = err else {
            panic!("expected a formatter failure");
        };
        assert!(message.starts_with("Formatter failed in "));
        assert!(message.contains("ms: echo partial; echo broken >&2; exit 2"));
        assert!(message.ends_with("Reason: exited with code 2"));

        let log = harness.log();
        assert!(log.contains("Reason: exited with code 2"));
        assert!(log.contains("Stderr:\nbroken\n"));
        assert!(log.contains("Stdout:\npartial\n"));
        assert_eq!(harness.notifier.errors(), vec![message]);
        assert_eq!(harness.channel.shown(), 0);
    }

    #[test]
    fn signal_termination_is_named() {
        let harness = Harness::new();
        let err = harness.format("kill -9 $$", "x\n").unwrap_err();

        let message = err.to_string();
        assert!(message.contains("terminated by signal SIGKILL"));
        assert!(!message.contains("exited with code"));
    }

    #[test]
    fn show_output_action_reveals_channel() {
        let harness = Harness::with_notifier(RecordingNotifier::choosing(SHOW_OUTPUT));
        assert!(harness.format("exit 1", "x\n").is_err());
        assert_eq!(harness.channel.shown(), 1);
    }

    #[test]
    fn stderr_on_success_is_logged_not_reported() {
        let harness = Harness::new();
        let edits = harness.format("cat; echo careful >&2", "a\n").unwrap();

        assert_eq!(edits[0].new_text, "a\n");
        assert!(harness.log().contains("Possible issues occurred:\ncareful\n"));
        assert!(harness.notifier.errors().is_empty());
    }

    #[test]
    fn command_placeholders_are_filled_per_request() {
        let harness = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let path = root.join("src").join("lib.txt");
        let workspace = Workspace::new(vec![root.clone()]);
        let doc = Document::new(path.clone(), "plaintext", "x\n");
        let options = FormattingOptions {
            tab_size: 2,
            insert_spaces: false,
        };

        let edits = harness
            .provider("echo ${tabSize} ${insertSpaces} ${fileRelativeToWorkspace} ${file}; pwd -P")
            .provide_edits(&doc, options, &workspace)
            .wait()
            .unwrap();

        let expected = format!("2 false src/lib.txt {}\n{}\n", path.display(), root.display());
        assert_eq!(edits[0].new_text, expected);
    }

    #[test]
    fn target_range_is_captured_at_request_time() {
        let harness = Harness::new();
        let mut doc = Document::new(PathBuf::from("/tmp/a.txt"), "plaintext", "one\n");
        let pending = harness.provider("sleep 0.1; cat").provide_edits(
            &doc,
            FormattingOptions::default(),
            &Workspace::default(),
        );
        doc.rope.insert(0, "zero\n");

        let edits = pending.wait().unwrap();
        assert_eq!(edits[0].new_text, "one\n");
        assert_eq!(edits[0].range.end, Position::new(1, 0));
    }

    #[test]
    fn try_wait_polls_until_done() {
        let harness = Harness::new();
        let doc = Document::new("/tmp/a.txt", "plaintext", "a\n");
        let pending = harness.provider("cat").provide_edits(
            &doc,
            FormattingOptions::default(),
            &Workspace::default(),
        );

        let result = loop {
            if let Some(result) = pending.try_wait() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn missing_working_directory_fails_to_start() {
        let harness = Harness::new();
        let workspace = Workspace::new(vec![PathBuf::from("/nonexistent/custom-formatters")]);
        let doc = Document::new("/tmp/a.txt", "plaintext", "a\n");

        let err = harness
            .provider("cat")
            .provide_edits(&doc, FormattingOptions::default(), &workspace)
            .wait()
            .unwrap_err();

        assert!(matches!(err, FormatError::Spawn { .. }));
        assert_eq!(harness.notifier.errors().len(), 1);
    }
}
