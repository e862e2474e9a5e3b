//! Common error types for SealPipe.

use thiserror::Error;

/// Top-level error type for SealPipe operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Conflicting or missing key-source arguments.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Key derivation parameters were rejected or derivation failed.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Key material has the wrong length or encoding.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk did not authenticate under the supplied key.
    #[error("Authentication failed at chunk {chunk}: wrong key or tampered data")]
    Authentication {
        /// Zero-based index of the chunk that failed to verify.
        chunk: u64,
    },

    /// The stream ended before its final chunk.
    #[error("Truncated stream: {0}")]
    TruncatedStream(String),

    /// The stream is not in a format this version understands.
    #[error("Invalid stream format: {0}")]
    InvalidFormat(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Usage(_) => ErrorKind::Usage,
            Error::KeyDerivation(_) => ErrorKind::KeyDerivation,
            Error::InvalidKey(_) => ErrorKind::InvalidKey,
            Error::Io(_) => ErrorKind::Io,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::TruncatedStream(_) => ErrorKind::TruncatedStream,
            Error::InvalidFormat(_) | Error::Serialization(_) => ErrorKind::InvalidFormat,
        }
    }
}

/// Coarse error category, stable enough for scripts to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    KeyDerivation,
    InvalidKey,
    Io,
    Authentication,
    TruncatedStream,
    InvalidFormat,
}

impl ErrorKind {
    /// Process exit code reported for this category.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Usage => 2,
            ErrorKind::KeyDerivation => 3,
            ErrorKind::InvalidKey => 4,
            ErrorKind::Io => 5,
            ErrorKind::Authentication => 6,
            ErrorKind::TruncatedStream => 7,
            ErrorKind::InvalidFormat => 8,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
