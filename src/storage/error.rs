//! Storage error types.

use thiserror::Error;

/// Errors that can occur while reading or writing persisted values.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform has no user data directory.
    #[error("no data directory available on this platform")]
    NoDataDir,

    /// The key cannot be mapped to a storage location.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Reading a stored value failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a value failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true if this error came from the filesystem.
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. })
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NoDataDir => "pass --data-dir to choose where state is stored",
            Self::InvalidKey(_) => "keys may only contain letters, digits, '-' and '_'",
            Self::Read { .. } | Self::Write { .. } => "check permissions on the data directory",
            Self::Encode(_) => "this is a bug; please report it",
        }
    }
}
