//! Configuration for the ICQ runtime.
//!
//! Layered loading with figment (defaults, files, `ICQ_*` environment
//! variables, overrides) into an [`IcqConfig`], plus validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, IcqConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PollingConfig,
    RetryConfig, SpanEventConfig,
};
pub use validation::validate_config;
