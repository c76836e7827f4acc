pub mod config;
pub mod document;
pub mod language;
pub mod platform;
pub mod workspace;
