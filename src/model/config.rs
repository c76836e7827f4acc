use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::model::platform::Platform;

/// Settings table holding the formatter definitions.
pub const NAMESPACE: &str = "josephusCustomFormatters";

/// A formatter command: one template for every platform, or a table keyed by
/// platform identifier with `"*"` as the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Template(String),
    PerPlatform(BTreeMap<String, String>),
}

impl CommandSpec {
    /// Pick the template for `platform`. Empty strings count as missing.
    pub fn resolve(&self, platform: &Platform) -> Option<&str> {
        match self {
            CommandSpec::Template(template) => Some(template.as_str()).filter(|t| !t.is_empty()),
            CommandSpec::PerPlatform(table) => platform.candidates().find_map(|key| {
                table
                    .get(key)
                    .map(String::as_str)
                    .filter(|t| !t.is_empty())
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatterDefinition {
    #[serde(default)]
    pub command: Option<CommandSpec>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

impl FormatterDefinition {
    /// Declared languages, `None` when the list is missing or empty.
    pub fn languages(&self) -> Option<&[String]> {
        self.languages.as_deref().filter(|langs| !langs.is_empty())
    }

    pub fn resolve_command(&self, platform: &Platform) -> Option<&str> {
        self.command.as_ref()?.resolve(platform)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionConfig {
    pub formatters: Vec<FormatterDefinition>,
    /// One message per entry that failed to decode. Those entries are dropped;
    /// the rest still load.
    pub rejected: Vec<String>,
}

/// Namespace table with each entry left undecoded.
#[derive(Debug, Deserialize)]
struct RawExtensionConfig {
    #[serde(default)]
    formatters: Vec<toml::Value>,
}

impl ExtensionConfig {
    fn from_raw(raw: RawExtensionConfig) -> Self {
        let mut config = Self::default();
        for (index, entry) in raw.formatters.into_iter().enumerate() {
            match entry.try_into::<FormatterDefinition>() {
                Ok(definition) => config.formatters.push(definition),
                Err(err) => config.rejected.push(format!(
                    "Invalid custom formatter definition #{}: {}",
                    index + 1,
                    err.to_string().trim_end()
                )),
            }
        }
        config
    }
}

/// The host's settings file, read in full on every load.
///
/// Remembers the last value of the [`NAMESPACE`] table so a file change that
/// leaves it untouched does not trigger a reload.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    last: Option<toml::Value>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: None,
        }
    }

    /// `<config dir>/settings.toml` for this application.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "custom-formatters")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the formatter definitions. A missing file or namespace yields an
    /// empty configuration.
    pub fn load(&mut self) -> Result<ExtensionConfig, ConfigError> {
        let section = self.read_section();
        self.apply(section)
    }

    /// Re-read the file and return the new configuration only when the
    /// namespace changed since the last read.
    pub fn refresh(&mut self) -> Result<Option<ExtensionConfig>, ConfigError> {
        let section = self.read_section();
        if let Ok(current) = &section
            && *current == self.last
        {
            return Ok(None);
        }
        self.apply(section).map(Some)
    }

    fn apply(
        &mut self,
        section: Result<Option<toml::Value>, ConfigError>,
    ) -> Result<ExtensionConfig, ConfigError> {
        let section = match section {
            Ok(section) => section,
            Err(err) => {
                self.last = None;
                return Err(err);
            }
        };
        self.last = section.clone();

        let Some(value) = section else {
            return Ok(ExtensionConfig::default());
        };

        value
            .try_into::<RawExtensionConfig>()
            .map(ExtensionConfig::from_raw)
            .map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    fn read_section(&self) -> Result<Option<toml::Value>, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut table: toml::Table = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        Ok(table.remove(NAMESPACE))
    }
}
