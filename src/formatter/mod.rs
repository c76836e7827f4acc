pub mod extension;
pub mod process;
pub mod provider;
pub mod registrar;
pub mod registry;
pub mod template;

pub use extension::Extension;
pub use provider::{Edits, FormatProvider, PendingFormat};
pub use registrar::Registrar;
pub use registry::{FormatterRegistry, HandlerKey, LanguageRegistry};
