//! Common error types used throughout audioprobe.

/// Common error type for audioprobe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A container name outside the supported whitelist.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// A status label that does not name a probe status.
    #[error("unknown probe status: {0}")]
    UnknownStatus(String),
}

impl Error {
    /// Create a new UnsupportedFormat error.
    pub fn unsupported_format<S: Into<String>>(name: S) -> Self {
        Self::UnsupportedFormat(name.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
