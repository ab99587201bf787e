//! Error types shared by every layer of the ICQ framework.
//!
//! Two families live here:
//!
//! - [`DecodeError`]: an envelope could not be turned into an [`Event`](crate::Event).
//!   The dispatch engine logs these and drops the single offending event.
//! - [`ApiError`]: an outbound call (or the long-poll fetch) failed. The engine
//!   distinguishes [`ApiError::Timeout`] from every other variant.

use thiserror::Error;

use crate::model::EventKind;

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors produced while decoding a raw event envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The envelope lacks a usable `eventId` or `type`.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope's `type` is not one of the known event kinds.
    #[error("unknown event kind '{0}'")]
    UnknownEventKind(String),

    /// A field required by the event kind is missing or has the wrong shape.
    #[error("malformed {kind} payload: {reason}")]
    MalformedEventPayload {
        /// The kind the payload was decoded as.
        kind: EventKind,
        /// Why the payload was rejected.
        reason: String,
    },
}

impl DecodeError {
    /// Creates a malformed payload error.
    pub fn malformed(kind: EventKind, reason: impl Into<String>) -> Self {
        Self::MalformedEventPayload {
            kind,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by bot API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request exceeded its time budget.
    #[error("API call timed out")]
    Timeout,

    /// The server answered with a non-success HTTP status.
    #[error("API call failed with HTTP {status}: {body}")]
    ApiCallFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request could not be sent or the connection broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Reading a local file for upload failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The operation does not apply to the event it was invoked on.
    #[error("'{operation}' is not available for {kind} events")]
    NotApplicable {
        /// The convenience operation that was requested.
        operation: &'static str,
        /// Kind of the event it was requested on.
        kind: EventKind,
    },
}

impl ApiError {
    /// Creates a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a response decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Returns `true` for [`ApiError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for envelope decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;
