//! Handler system for the ICQ framework.
//!
//! Handlers are plain async functions. Their parameters are extracted from the
//! event context through [`FromContext`], and their return value is consumed
//! by [`HandleResponse`]:
//!
//! ```rust,ignore
//! // No parameters, no return
//! async fn ping() {}
//!
//! // Return a String - it is sent back to the originating chat
//! async fn echo(msg: MessageEvent) -> Option<String> {
//!     msg.text
//! }
//!
//! // Return a Result - errors are logged with the event's context and the
//! // invocation is reported as failed
//! async fn pin_it(ctx: Arc<IcqContext>) -> ApiResult<()> {
//!     ctx.pin().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, error};

use crate::context::IcqContext;
use crate::extractor::FromContext;

// ============================================================================
// Outcome - What became of one invocation
// ============================================================================

/// How a single handler invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler ran and its response was delivered.
    Completed,
    /// A parameter could not be extracted from the event, so the handler
    /// never ran.
    Skipped,
    /// The handler returned an error, or its response could not be sent.
    Failed,
}

// ============================================================================
// HandleResponse - Handle handler return values
// ============================================================================

/// A trait for types that can handle handler return values.
#[async_trait]
pub trait HandleResponse: Send {
    /// Consumes the value in the context of the event that produced it.
    async fn into_response(self, ctx: Arc<IcqContext>) -> Outcome;
}

#[async_trait]
impl HandleResponse for () {
    async fn into_response(self, _ctx: Arc<IcqContext>) -> Outcome {
        Outcome::Completed
    }
}

/// Sends the string to the originating chat.
#[async_trait]
impl HandleResponse for String {
    async fn into_response(self, ctx: Arc<IcqContext>) -> Outcome {
        match ctx.answer(&self).await {
            Ok(_) => Outcome::Completed,
            Err(e) => {
                error!(
                    event_id = ctx.event_id(),
                    kind = %ctx.kind(),
                    chat_id = %ctx.chat_id(),
                    "Failed to send handler response: {e}"
                );
                Outcome::Failed
            }
        }
    }
}

/// On Some, the inner value's response is handled. On None, no action is taken.
#[async_trait]
impl<T: HandleResponse> HandleResponse for Option<T> {
    async fn into_response(self, ctx: Arc<IcqContext>) -> Outcome {
        match self {
            Some(t) => t.into_response(ctx).await,
            None => Outcome::Completed,
        }
    }
}

/// On Ok, the inner value's response is handled. On Err, the error is logged
/// and the invocation counts as failed.
#[async_trait]
impl<T: HandleResponse, E: std::fmt::Display + Send> HandleResponse for Result<T, E> {
    async fn into_response(self, ctx: Arc<IcqContext>) -> Outcome {
        match self {
            Ok(t) => t.into_response(ctx).await,
            Err(e) => {
                error!(
                    event_id = ctx.event_id(),
                    kind = %ctx.kind(),
                    chat_id = %ctx.chat_id(),
                    "Handler error: {e}"
                );
                Outcome::Failed
            }
        }
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// An async event handler.
///
/// Implemented for async functions that take up to eight [`FromContext`]
/// parameters and return a [`HandleResponse`].
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Call the handler with the given context.
    async fn call(self, ctx: Arc<IcqContext>) -> Outcome;
}

// ============================================================================
// BoxedHandler - Type-erased handler stored in collections
// ============================================================================

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn Fn(Arc<IcqContext>) -> BoxFuture<'static, Outcome> + Send + Sync>;

/// Convert a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T> + Send + Sync + 'static,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

// ============================================================================
// Handler implementations for functions
// ============================================================================

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandleResponse + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            async fn call(self, ctx: Arc<IcqContext>) -> Outcome {
                $(
                    let $ty = match $ty::from_context(&ctx) {
                        Ok(value) => value,
                        Err(e) => {
                            debug!(
                                event_id = ctx.event_id(),
                                kind = %ctx.kind(),
                                "Handler skipped: {e}"
                            );
                            return Outcome::Skipped;
                        }
                    };
                )*

                let res = (self)($($ty,)*).await;
                res.into_response(ctx).await
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use icq_core::{EventKind, MessageEvent};

    use super::*;
    use crate::context::tests::{RecordingBot, callback, message};

    fn ctx_with(bot: Arc<RecordingBot>, event: icq_core::Event) -> Arc<IcqContext> {
        Arc::new(IcqContext::new(3, event, bot))
    }

    #[tokio::test]
    async fn test_string_response_is_sent() {
        let bot = Arc::new(RecordingBot::default());
        let handler = into_handler(|msg: MessageEvent| async move { msg.text });

        let outcome = handler(ctx_with(bot.clone(), message(EventKind::NewMessage, "echo me"))).await;
        assert_eq!(outcome, Outcome::Completed);

        let calls = bot.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.get("text"), Some("echo me"));
    }

    #[tokio::test]
    async fn test_unextractable_handler_is_skipped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = into_handler(move |_msg: MessageEvent| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let bot = Arc::new(RecordingBot::default());
        let outcome = handler(ctx_with(bot, callback("x"))).await;
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_response_is_reported_as_failure() {
        let bot = Arc::new(RecordingBot::default());
        let handler = into_handler(|| async { Err::<(), _>("boom") });
        let outcome = handler(ctx_with(bot.clone(), message(EventKind::NewMessage, "hi"))).await;
        assert_eq!(outcome, Outcome::Failed);
        assert!(bot.methods().is_empty());
    }

    #[tokio::test]
    async fn test_none_response_completes_silently() {
        let bot = Arc::new(RecordingBot::default());
        let handler = into_handler(|| async { None::<String> });
        let outcome = handler(ctx_with(bot.clone(), message(EventKind::NewMessage, "hi"))).await;
        assert_eq!(outcome, Outcome::Completed);
        assert!(bot.methods().is_empty());
    }
}
