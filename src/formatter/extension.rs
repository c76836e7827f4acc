use crate::formatter::registrar::Registrar;
use crate::formatter::registry::{FormatterRegistry, HandlerKey};
use crate::model::config::{ExtensionConfig, SettingsStore};

/// Activation state: the settings source and every live registration.
///
/// Registrations are replaced wholesale. Each reload releases all current
/// handles before registering from the freshly read configuration.
pub struct Extension {
    settings: SettingsStore,
    registrar: Registrar,
    registrations: Vec<HandlerKey>,
}

impl Extension {
    /// Read the settings and register the initial formatters.
    pub fn activate(
        settings: SettingsStore,
        registrar: Registrar,
        registry: &mut dyn FormatterRegistry,
    ) -> Self {
        let mut extension = Self {
            settings,
            registrar,
            registrations: Vec::new(),
        };

        let config = extension.load_config();
        extension.install(&config, registry);

        tracing::info!(
            settings = %extension.settings.path().display(),
            registered = extension.registrations.len(),
            "custom formatters activated"
        );
        extension
    }

    pub fn registrations(&self) -> &[HandlerKey] {
        &self.registrations
    }

    /// Handle a change notification for the settings file. Reloads only when
    /// the formatter namespace changed; returns whether it did.
    pub fn on_settings_changed(&mut self, registry: &mut dyn FormatterRegistry) -> bool {
        let config = match self.settings.refresh() {
            Ok(None) => return false,
            Ok(Some(config)) => config,
            Err(err) => {
                self.report_config_error(&err);
                ExtensionConfig::default()
            }
        };

        self.replace(&config, registry);
        true
    }

    /// Release every live registration.
    pub fn deactivate(mut self, registry: &mut dyn FormatterRegistry) {
        self.release_all(registry);
        tracing::info!("custom formatters deactivated");
    }

    fn replace(&mut self, config: &ExtensionConfig, registry: &mut dyn FormatterRegistry) {
        self.release_all(registry);
        self.install(config, registry);
        self.registrar
            .channel()
            .append_line("Reloaded custom formatter configurations");
        tracing::info!(
            registered = self.registrations.len(),
            "custom formatter configurations reloaded"
        );
    }

    /// Report entries that failed to decode, then register the rest.
    fn install(&mut self, config: &ExtensionConfig, registry: &mut dyn FormatterRegistry) {
        for message in &config.rejected {
            tracing::error!("{message}");
            self.registrar.notifier().show_error(message, &[]);
        }
        self.registrations = self.registrar.register_all(&config.formatters, registry);
    }

    fn release_all(&mut self, registry: &mut dyn FormatterRegistry) {
        for key in self.registrations.drain(..) {
            registry.release(key);
        }
    }

    fn load_config(&mut self) -> ExtensionConfig {
        match self.settings.load() {
            Ok(config) => config,
            Err(err) => {
                self.report_config_error(&err);
                ExtensionConfig::default()
            }
        }
    }

    fn report_config_error(&self, err: &crate::error::ConfigError) {
        tracing::error!("{err}");
        self.registrar
            .notifier()
            .show_error(&format!("Failed to load custom formatter settings: {err}"), &[]);
    }
}
