use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Result, anyhow};

use custom_formatters::FormatError;
use custom_formatters::formatter::{Edits, Extension, LanguageRegistry};
use custom_formatters::model::document::{Document, FormattingOptions};
use custom_formatters::model::language::language_for_path;
use custom_formatters::model::workspace::Workspace;

use crate::msg::Msg;

/// Long-running host: formats files named on stdin and reloads formatters
/// when the settings file changes.
pub struct App {
    registry: LanguageRegistry,
    extension: Option<Extension>,
    workspace: Workspace,
    options: FormattingOptions,
    event_tx: mpsc::Sender<Msg>,
    in_flight: usize,
    input_closed: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        registry: LanguageRegistry,
        extension: Extension,
        workspace: Workspace,
        options: FormattingOptions,
        event_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            registry,
            extension: Some(extension),
            workspace,
            options,
            event_tx,
            in_flight: 0,
            input_closed: false,
            should_quit: false,
        }
    }

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::FormatFile(path) => {
                if let Err(err) = self.start_format(path.clone()) {
                    println!("failed {}: {err}", path.display());
                }
            }
            Msg::FormatFinished { document, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.finish_format(document, result);
            }
            Msg::SettingsChanged => {
                if let Some(extension) = self.extension.as_mut()
                    && extension.on_settings_changed(&mut self.registry)
                {
                    tracing::info!(languages = ?self.registry.languages(), "formatters reloaded");
                }
            }
            Msg::InputClosed => self.input_closed = true,
        }

        self.should_quit = self.input_closed && self.in_flight == 0;
        Ok(())
    }

    /// Release every registration before exit.
    pub fn shutdown(&mut self) {
        if let Some(extension) = self.extension.take() {
            extension.deactivate(&mut self.registry);
        }
    }

    fn start_format(&mut self, path: PathBuf) -> Result<()> {
        let path = std::path::absolute(&path)?;
        let language = language_for_path(&path);
        let provider = self
            .registry
            .provider_for(language)
            .ok_or_else(|| anyhow!("no custom formatter registered for language `{language}`"))?;

        let document = Document::from_file(path, language)?;
        let pending = provider.provide_edits(&document, self.options, &self.workspace);
        self.in_flight += 1;

        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let result = pending.wait();
            let _ = tx.send(Msg::FormatFinished { document, result });
        });
        Ok(())
    }

    fn finish_format(&self, mut document: Document, result: Result<Edits, FormatError>) {
        let path = document.path().display().to_string();
        match result {
            Ok(edits) if edits.is_empty() => println!("unchanged {path}"),
            Ok(edits) => {
                document.apply_edits(&edits);
                match document.save() {
                    Ok(()) => println!("formatted {path}"),
                    Err(err) => {
                        tracing::error!("save failed: {err}");
                        println!("failed {path}: {err}");
                    }
                }
            }
            Err(err) => println!("failed {path}: {}", err.to_string().replace('\n', " ")),
        }
    }
}
