use std::sync::Arc;

use crate::formatter::provider::FormatProvider;
use crate::formatter::registry::{FormatterRegistry, HandlerKey};
use crate::host::{Notifier, OutputChannel};
use crate::model::config::FormatterDefinition;
use crate::model::platform::Platform;

/// Turns formatter definitions into live registrations.
#[derive(Clone)]
pub struct Registrar {
    platform: Platform,
    channel: Arc<dyn OutputChannel>,
    notifier: Arc<dyn Notifier>,
}

impl Registrar {
    pub fn new(
        platform: Platform,
        channel: Arc<dyn OutputChannel>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            platform,
            channel,
            notifier,
        }
    }

    pub fn channel(&self) -> &Arc<dyn OutputChannel> {
        &self.channel
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Register one provider per usable definition, in order. A bad definition
    /// is reported and skipped; the rest still register.
    pub fn register_all(
        &self,
        definitions: &[FormatterDefinition],
        registry: &mut dyn FormatterRegistry,
    ) -> Vec<HandlerKey> {
        definitions
            .iter()
            .filter_map(|definition| self.register_one(definition, registry))
            .collect()
    }

    fn register_one(
        &self,
        definition: &FormatterDefinition,
        registry: &mut dyn FormatterRegistry,
    ) -> Option<HandlerKey> {
        if definition.disabled {
            tracing::debug!(languages = ?definition.languages, "skipping disabled custom formatter");
            return None;
        }

        let Some(languages) = definition.languages() else {
            tracing::warn!("custom formatter has no languages, not registering");
            self.notifier
                .show_error("Custom formatter does not have any languages defined", &[]);
            return None;
        };

        let Some(template) = definition.resolve_command(&self.platform) else {
            tracing::warn!(
                ?languages,
                platform = self.platform.key,
                "no custom formatter command for this platform"
            );
            self.notifier.show_warning(&format!(
                "Not registering custom formatter for languages {}, because no command is specified for this platform",
                language_list(languages)
            ));
            return None;
        };

        let provider = FormatProvider::new(
            template,
            Arc::clone(&self.channel),
            Arc::clone(&self.notifier),
        );
        tracing::debug!(?languages, template, "registering custom formatter");
        Some(registry.register(languages, provider))
    }
}

fn language_list(languages: &[String]) -> String {
    let quoted: Vec<String> = languages.iter().map(|lang| format!("\"{lang}\"")).collect();
    format!("[{}]", quoted.join(","))
}
