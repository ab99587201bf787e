//! Runtime error types.

use icq_core::ApiError;
use icq_framework::RegistrationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bot client could not be created.
    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),

    /// A handler registration was rejected.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// The runtime was already started; registrations are frozen.
    #[error("Runtime already started")]
    AlreadyStarted,

    /// Installing the shutdown signal handler failed.
    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
