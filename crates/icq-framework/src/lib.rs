//! # ICQ Framework
//!
//! Event handling on top of `icq-core`:
//!
//! - Per-event context with chat-bound convenience operations ([`IcqContext`])
//! - Handler trait for async functions with parameter injection ([`Handler`], [`FromContext`])
//! - Middleware gate that can veto events by kind ([`Middleware`], [`MiddlewareGate`])
//! - Registrations and the routing rule ([`HandlerRegistry`], `on_*` builders)
//! - Built-in help listing ([`HelpConfig`])
//! - Batch dispatcher with per-invocation fault isolation ([`Dispatcher`])
//!
//! The poll loop that feeds batches into the dispatcher lives in
//! `icq-runtime`.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod help;
pub mod middleware;
pub mod registry;

pub use context::IcqContext;
pub use dispatcher::{BatchReport, Dispatcher};
pub use error::{BoxError, ExtractError, ExtractResult, RegistrationError, RegistrationResult};
pub use extractor::FromContext;
pub use handler::{BoxedHandler, HandleResponse, Handler, Outcome, into_handler};
pub use help::{HelpConfig, HelpMode};
pub use middleware::{
    BoxedMiddleware, FnMiddleware, GateVerdict, Middleware, MiddlewareGate, middleware_fn,
};
pub use registry::{
    HandlerRegistry, Registration, RegistrationBuilder, on, on_callback_query,
    on_changed_chat_info, on_command, on_deleted_message, on_edited_message,
    on_left_chat_members, on_message, on_new_chat_members, on_pinned_message, on_start,
    on_unpinned_message,
};
