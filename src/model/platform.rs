/// Key matching any platform in a per-platform command table.
pub const WILDCARD: &str = "*";

/// Identifies the platform a command table is resolved against.
///
/// `key` uses the identifiers editors built on Node report (`linux`, `darwin`,
/// `win32`, ...); `alias` is the Rust name for the same OS so `macos` and
/// `windows` work as table keys too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub key: &'static str,
    pub alias: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &'static str) -> Self {
        let key = match os {
            "macos" => "darwin",
            "windows" => "win32",
            "solaris" | "illumos" => "sunos",
            other => other,
        };
        Self { key, alias: os }
    }

    /// Lookup order for a command table: platform key, Rust alias, wildcard.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> {
        let alias = (self.alias != self.key).then_some(self.alias);
        std::iter::once(self.key)
            .chain(alias)
            .chain(std::iter::once(WILDCARD))
    }
}
