//! Error types for wrapkit
//!
//! All fallible operations return `Result<T, Error>`.
//! Error types provide context for diagnosis.

use thiserror::Error;

/// wrapkit error types
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Syntax or structure violation while reading a source unit
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The wrapper lacks a capability required to scaffold it
    #[error("Capability error: {0}")]
    CapabilityError(String),

    /// Compiled-bytecode artifact lookup failed
    #[error("Artifact error: {0}")]
    ArtifactError(String),

    /// Filesystem failure
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// Target module could not be loaded
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// Module loaded but the class is absent
    #[error("Class '{class}' not found in module {module}")]
    ClassNotFound { module: String, class: String },

    /// Constructed instance has no operation with that name
    #[error("Operation '{operation}' not found on {class}")]
    OperationNotFound { class: String, operation: String },

    /// Mutating or deploy call attempted without a signing context
    #[error("No sender connected")]
    NoSender,

    /// Argument map does not match the expected shape
    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),

    /// Stored bytecode is not valid hexadecimal
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),

    /// Failure raised by the invoked operation itself
    #[error("Invocation error: {0}")]
    InvocationError(String),
}

impl Error {
    /// Build an `Io` error from a path and the underlying failure
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for wrapkit operations
pub type Result<T> = std::result::Result<T, Error>;
