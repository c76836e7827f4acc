use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum FormatError {
    /// The shell itself could not be started.
    #[error("failed to start formatter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The formatter ran and reported failure. Carries the text written to the
    /// diagnostic channel.
    #[error("{0}")]
    Failed(String),
    #[error("formatter run ended without reporting a result")]
    Disconnected,
}
