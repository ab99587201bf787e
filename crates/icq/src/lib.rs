//! # ICQ
//!
//! An async framework for bots on the ICQ / VK Teams (myteam) bot API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  batch   ┌────────────┐  event  ┌────────────────┐  match  ┌──────────────────┐
//! │   Poller    │─────────▶│ Dispatcher │────────▶│ MiddlewareGate │────────▶│ handler (task)   │──▶ BotApi
//! │  (cursor)   │◀─────────│            │         │  (veto by kind)│────────▶│ handler (task)   │──▶ BotApi
//! └─────────────┘  joined  └────────────┘         └────────────────┘         └──────────────────┘
//!        │
//!        ▼ events/get (long poll)
//!    HttpBot
//! ```
//!
//! - **Runtime**: configuration, logging, the poll loop and shutdown
//! - **Dispatcher**: decodes each envelope, runs it through the gate and
//!   fans it out to every matching registration
//! - **Handlers**: async functions whose parameters are extracted from the
//!   event context
//! - **BotApi**: typed wrappers for every vendor REST method
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use icq::prelude::*;
//!
//! async fn echo(ctx: Arc<IcqContext>) -> Option<String> {
//!     ctx.text().map(str::to_string)
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = IcqRuntime::new()?;
//!     runtime.register(on_message().handler(echo))?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: read `icq.toml`
//! - `yaml-config`: read `icq.yaml`
//! - `json-log`: JSON log format

pub use icq_core as core;
pub use icq_framework as framework;
pub use icq_runtime as runtime;
pub use icq_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use icq::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - main entry point
    pub use icq_runtime::{IcqConfig, IcqRuntime, RuntimeError, RuntimeResult, StopHandle};

    // Registrations
    pub use icq_framework::{
        Registration, on, on_callback_query, on_changed_chat_info, on_command,
        on_deleted_message, on_edited_message, on_left_chat_members, on_message,
        on_new_chat_members, on_pinned_message, on_start, on_unpinned_message,
    };

    // Handlers and extractors
    pub use icq_framework::{BoxError, FromContext, HandleResponse, IcqContext, Outcome};

    // Middleware
    pub use icq_framework::{Middleware, middleware_fn};

    // Bot API
    pub use icq_core::{
        ApiError, ApiResult, Bot, BotApi, BoxedBot, ButtonStyle, Format, FormatStyle,
        InlineKeyboardMarkup, KeyboardButton, ParseMode, SendOptions,
    };

    // Events
    pub use icq_core::{
        CallbackQueryEvent, ChatRef, Event, EventKind, MembersEvent, MessageEvent, UserRef,
    };
}
