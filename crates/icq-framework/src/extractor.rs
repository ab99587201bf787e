//! Extractor system for the ICQ framework.
//!
//! [`FromContext`] turns an [`IcqContext`] into handler parameters. A handler
//! whose parameters cannot be extracted for the event at hand is skipped:
//!
//! ```rust,ignore
//! // Only runs for events that carry a message payload.
//! async fn echo(ctx: Arc<IcqContext>, msg: MessageEvent) -> ApiResult<()> {
//!     ctx.answer(msg.text.as_deref().unwrap_or_default()).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use icq_core::{BoxedBot, CallbackQueryEvent, ChatRef, Event, MembersEvent, MessageEvent};

use crate::context::IcqContext;
use crate::error::{ExtractError, ExtractResult};

/// A trait for types that can be extracted from an [`IcqContext`].
///
/// # Error Handling
///
/// The extraction can fail (returning `Err`) if the required data is not
/// available in the context. In this case, the handler will be skipped.
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self>;
}

/// The whole context, for handlers that use the convenience operations.
impl FromContext for Arc<IcqContext> {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

impl FromContext for BoxedBot {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        Ok(ctx.bot_arc())
    }
}

impl FromContext for Arc<Event> {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        Ok(ctx.event_arc())
    }
}

/// The originating chat; available for every kind.
impl FromContext for ChatRef {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        Ok(ctx.chat().clone())
    }
}

/// Payload of new, edited and pinned messages.
impl FromContext for MessageEvent {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        ctx.event()
            .as_message()
            .cloned()
            .ok_or(ExtractError::EventKindMismatch {
                expected: "message",
                got: ctx.kind(),
            })
    }
}

impl FromContext for CallbackQueryEvent {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        ctx.event()
            .as_callback()
            .cloned()
            .ok_or(ExtractError::EventKindMismatch {
                expected: "callbackQuery",
                got: ctx.kind(),
            })
    }
}

/// Payload of member join and leave events.
impl FromContext for MembersEvent {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        ctx.event()
            .as_members()
            .cloned()
            .ok_or(ExtractError::EventKindMismatch {
                expected: "chat members",
                got: ctx.kind(),
            })
    }
}

/// Implementation for `Option<T>` where `T: FromContext`.
///
/// This allows handlers to have optional parameters that may or may not
/// be extractable from the context.
impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<IcqContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}
