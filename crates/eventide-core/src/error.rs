//! Error types for eventide operations.
//!
//! Two families live here. [`EventideError`] covers setup failures that
//! are reported synchronously to whoever is configuring a factory or a
//! set of tools. [`TaggedError`] is the structured error value built by
//! the failure tools; at runtime it travels inside rejections.

use crate::types::OpKind;
use std::fmt;
use thiserror::Error;

/// Result type for eventide setup operations.
pub type Result<T> = std::result::Result<T, EventideError>;

/// The "constructor" of a tagged error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    #[default]
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    /// A caller-defined error kind.
    Custom(String),
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::Custom(name) => name,
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        ErrorKind::Custom(name.into())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A structured error: a kind plus a fully formatted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedError {
    kind: ErrorKind,
    message: String,
    cause: Option<String>,
}

impl TaggedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Attach a description of the underlying cause.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl fmt::Display for TaggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for TaggedError {}

/// Errors raised while configuring eventide components.
#[derive(Error, Debug, Clone)]
pub enum EventideError {
    #[error("Handler does not implement required operation {0}")]
    MissingCapability(OpKind),

    #[error("Unknown escape name {0:?} (expected one of then, catch, finally)")]
    UnknownEscapeName(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("{0}")]
    Tagged(TaggedError),
}

impl EventideError {
    /// The tagged error, if this failure was produced by a tagger.
    pub fn as_tagged(&self) -> Option<&TaggedError> {
        match self {
            EventideError::Tagged(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaggedError> for EventideError {
    fn from(err: TaggedError) -> Self {
        EventideError::Tagged(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_error_display() {
        let err = TaggedError::type_error("Unexpected receiver");
        assert_eq!(err.to_string(), "TypeError: Unexpected receiver");

        let bare = TaggedError::new(ErrorKind::custom("Halt"), "");
        assert_eq!(bare.to_string(), "Halt");
    }

    #[test]
    fn test_with_cause() {
        let err = TaggedError::new(ErrorKind::Error, "outer").with_cause("inner");
        assert_eq!(err.cause(), Some("inner"));
    }

    #[test]
    fn test_setup_error_wraps_tagged() {
        let err: EventideError = TaggedError::type_error("nope").into();
        assert_eq!(err.to_string(), "TypeError: nope");
        assert!(err.as_tagged().is_some());
        assert!(EventideError::MissingCapability(OpKind::Get)
            .to_string()
            .contains("get"));
    }
}
