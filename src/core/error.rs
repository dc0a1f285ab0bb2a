//! Guard error types

use thiserror::Error;

/// Errors that can occur while building or driving the hook pipeline
///
/// Policy denials are not errors: they are [`Verdict::Deny`](crate::hooks::Verdict)
/// values. These variants cover setup failures and faults inside a handler.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A tool-name matcher or policy rule failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A path-shape matcher failed to compile
    #[error("Invalid glob: {0}")]
    InvalidGlob(#[from] glob::PatternError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The hook input names an event this pipeline does not handle
    #[error("Unsupported hook event: {0}")]
    UnsupportedEvent(String),

    /// Unexpected failure inside a handler
    #[error("Handler fault in {handler}: {message}")]
    HandlerFault {
        /// Name of the handler that failed
        handler: String,
        /// What went wrong
        message: String,
    },
}

impl GuardError {
    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        GuardError::InvalidConfig(msg.into())
    }

    /// Create a handler fault
    pub fn handler_fault(handler: impl Into<String>, message: impl Into<String>) -> Self {
        GuardError::HandlerFault {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for guard operations
pub type GuardResult<T> = Result<T, GuardError>;
