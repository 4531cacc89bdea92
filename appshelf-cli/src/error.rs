use appshelf_cache::CacheError;
use appshelf_lib::LibError;
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Engine failure
    #[error(transparent)]
    Lib(#[from] LibError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The requested id is not in the loaded catalog
    #[error("{0} is not in the catalog")]
    NotFound(String),
}

impl CliError {
    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
