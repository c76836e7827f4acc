use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::formatter::provider::FormatProvider;

slotmap::new_key_type! {
    /// Handle to one live registration. Releasing it unregisters the provider.
    pub struct HandlerKey;
}

/// The host's document-formatting registration mechanism.
pub trait FormatterRegistry {
    fn register(&mut self, languages: &[String], provider: FormatProvider) -> HandlerKey;

    /// Release a registration. Returns `false` for keys already released.
    fn release(&mut self, key: HandlerKey) -> bool;
}

#[derive(Debug)]
struct RegisteredHandler {
    languages: SmallVec<[String; 4]>,
    provider: FormatProvider,
    seq: u64,
}

/// In-process registry dispatching format requests by language identifier.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    handlers: SlotMap<HandlerKey, RegisteredHandler>,
    next_seq: u64,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, key: HandlerKey) -> bool {
        self.handlers.contains_key(key)
    }

    /// Earliest-registered live provider for `language`.
    pub fn provider_for(&self, language: &str) -> Option<&FormatProvider> {
        self.handlers
            .values()
            .filter(|handler| handler.languages.iter().any(|lang| lang == language))
            .min_by_key(|handler| handler.seq)
            .map(|handler| &handler.provider)
    }

    /// Every language with a live provider, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self
            .handlers
            .values()
            .flat_map(|handler| handler.languages.iter().cloned())
            .collect();
        langs.sort();
        langs.dedup();
        langs
    }
}

impl FormatterRegistry for LanguageRegistry {
    fn register(&mut self, languages: &[String], provider: FormatProvider) -> HandlerKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::debug!(?languages, template = provider.template(), "registering formatter");
        self.handlers.insert(RegisteredHandler {
            languages: languages.iter().cloned().collect(),
            provider,
            seq,
        })
    }

    fn release(&mut self, key: HandlerKey) -> bool {
        self.handlers.remove(key).is_some()
    }
}
