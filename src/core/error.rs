use std::fmt;
use thiserror::Error;

/// Position of a directive inside the routine body being compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{message} at {location}")]
    Scope {
        message: String,
        location: SourceLocation,
    },

    #[error("duplicate PRAGMA AUTONOMOUS_TRANSACTION at {0}")]
    DuplicateDirective(SourceLocation),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message} (hint: {hint})")]
    RemoteLinkUnavailable { message: String, hint: String },

    #[error("Context error: {message} ({detail})")]
    Context { message: String, detail: String },

    #[error("{message}: {detail}")]
    RemoteExecution { message: String, detail: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

impl DispatchError {
    pub(crate) fn context(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn remote(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RemoteExecution {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Failures raised while compiling a routine definition rather than at call time
    pub fn is_definition_error(&self) -> bool {
        matches!(self, Self::Scope { .. } | Self::DuplicateDirective(_))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

impl<T> From<std::sync::PoisonError<T>> for DispatchError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
