use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use custom_formatters::formatter::{Extension, LanguageRegistry, Registrar};
use custom_formatters::host::{LogChannel, Notifier};
use custom_formatters::model::config::SettingsStore;
use custom_formatters::model::platform::Platform;

#[derive(Debug, Default)]
pub struct Notices {
    pub errors: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
}

impl Notifier for Notices {
    fn show_error(&self, message: &str, _actions: &[&'static str]) -> Option<&'static str> {
        self.errors.lock().unwrap().push(message.to_string());
        None
    }

    fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// A settings file in a scratch directory plus the host doubles around it.
pub struct Host {
    pub dir: tempfile::TempDir,
    pub settings: PathBuf,
    pub channel: Arc<LogChannel>,
    pub notices: Arc<Notices>,
    pub registry: LanguageRegistry,
}

impl Host {
    pub fn with_settings(contents: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.toml");
        std::fs::write(&settings, contents).unwrap();
        Self {
            dir,
            settings,
            channel: Arc::new(LogChannel::new("Josephus' Custom Formatters")),
            notices: Arc::new(Notices::default()),
            registry: LanguageRegistry::new(),
        }
    }

    pub fn activate(&mut self) -> Extension {
        let registrar = Registrar::new(
            Platform::current(),
            self.channel.clone(),
            self.notices.clone(),
        );
        Extension::activate(
            SettingsStore::new(&self.settings),
            registrar,
            &mut self.registry,
        )
    }

    pub fn rewrite_settings(&self, contents: &str) {
        std::fs::write(&self.settings, contents).unwrap();
    }
}
