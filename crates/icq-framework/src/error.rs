//! Error types for the ICQ framework.

use icq_core::EventKind;
use thiserror::Error;

/// Error type middleware predicates may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during context extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The event is not of the kind the parameter needs.
    #[error("event kind mismatch: expected {expected}, got {got}")]
    EventKindMismatch {
        /// What the extractor accepts.
        expected: &'static str,
        /// Kind of the event being dispatched.
        got: EventKind,
    },

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Rejected handler registrations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A command prefix was given but it is empty.
    #[error("command prefix must not be empty")]
    EmptyCommand,

    /// Command prefixes only apply to new messages.
    #[error("command prefix given for {kind} handler; only newMessage handlers take commands")]
    CommandRequiresNewMessage {
        /// Kind the registration was made for.
        kind: EventKind,
    },
}

/// Result type for handler registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
