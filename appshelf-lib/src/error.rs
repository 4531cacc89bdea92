use appshelf_cache::CacheError;
use appshelf_remote::FetchError;
use thiserror::Error;

/// Errors surfaced by the catalog engine.
#[derive(Debug, Error)]
pub enum LibError {
    /// Filesystem failure during reconciliation or settings I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog document could not be parsed
    #[error("Catalog parse error: {0}")]
    Parse(String),

    /// A remote request failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Invalid settings file: {0}")]
    SettingsRead(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    SettingsWrite(#[from] toml::ser::Error),

    /// A catalog load is already running
    #[error("A catalog load is already in progress")]
    Busy,

    /// No reconciliation directory could be located
    #[error("Install root not found: {0}")]
    NoInstallRoot(String),
}

impl LibError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn no_install_root(msg: impl Into<String>) -> Self {
        Self::NoInstallRoot(msg.into())
    }
}
