//! Error types for audioprobe-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving tools and probing files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool failed to execute.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An auxiliary tool check ran past its deadline.
    #[error("{tool} timed out after {limit:?}")]
    Timeout { tool: String, limit: std::time::Duration },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// The specified file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A requested ffmpeg version is unknown or not installed.
    #[error("ffmpeg version {version} is not available")]
    VersionUnavailable { version: String },

    /// No ffmpeg version in the table could be located.
    #[error("no ffmpeg version is available")]
    NoToolAvailable,

    /// The last strategy in the ladder failed with an execution-level error.
    #[error("unable to probe file {}: {strategy} failed", path.display())]
    ProbeFailed {
        path: PathBuf,
        strategy: String,
        #[source]
        source: Box<Error>,
    },

    /// Every strategy produced an incomplete result.
    #[error("unable to probe file {}", path.display())]
    Unprobeable { path: PathBuf },

    /// ffmpeg reported a fatal condition in its diagnostic output.
    #[error("fatal error reported by ffmpeg: {pattern}")]
    FatalOutput { pattern: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a version unavailable error.
    pub fn unavailable(version: impl Into<String>) -> Self {
        Self::VersionUnavailable {
            version: version.into(),
        }
    }

    /// Whether this error, or the cause it wraps, means the source file is missing.
    pub fn is_file_not_found(&self) -> bool {
        match self {
            Self::FileNotFound { .. } => true,
            Self::ProbeFailed { source, .. } => source.is_file_not_found(),
            _ => false,
        }
    }
}
