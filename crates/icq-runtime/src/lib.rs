//! ICQ Runtime - configuration, logging and the poll loop.
//!
//! This crate provides:
//! - Layered configuration (`config`): defaults, `icq.toml`, `ICQ_*`
//!   environment variables and overrides
//! - Logging setup on `tracing-subscriber` (`logging`)
//! - The long-polling engine that owns the event cursor (`engine`)
//! - The [`IcqRuntime`] facade that wires them to an `HttpBot`
//!
//! ```rust,ignore
//! use icq_framework::on_message;
//! use icq_runtime::IcqRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = IcqRuntime::new()?;
//!     runtime.register(on_message().handler(|ctx: Arc<IcqContext>| async move {
//!         ctx.text().map(str::to_string)
//!     }))?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, IcqConfig};
pub use engine::{IterationOutcome, Poller, StopHandle};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{IcqRuntime, RuntimeBuilder};
