//! Middleware gate.
//!
//! A [`Middleware`] is a predicate that can veto dispatch of an event before
//! any handler sees it. Each middleware declares the event kinds it cares
//! about; the [`MiddlewareGate`] consults, in registration order, every
//! middleware that declared the event's kind. The first one answering `true`
//! suppresses the event and the rest are not asked.
//!
//! ```rust,ignore
//! let gate = MiddlewareGate::new().with(middleware_fn(
//!     "mute-spam",
//!     [EventKind::NewMessage],
//!     |ctx: Arc<IcqContext>| async move {
//!         Ok(ctx.text().is_some_and(|t| t.contains("spam")))
//!     },
//! ));
//! ```
//!
//! A middleware that returns an error or panics is logged and treated as if
//! it answered `false`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use icq_core::EventKind;
use tracing::{debug, error, trace};

use crate::context::IcqContext;
use crate::error::BoxError;

/// A predicate consulted before dispatch.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Kinds this middleware is consulted for.
    fn event_kinds(&self) -> &[EventKind];

    /// Returns `true` to suppress the event.
    ///
    /// Side effects such as deleting the message or warning the sender are
    /// performed here, through the context's bot handle.
    async fn check(&self, ctx: Arc<IcqContext>) -> Result<bool, BoxError>;
}

/// A shared middleware handle.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ============================================================================
// FnMiddleware
// ============================================================================

/// A middleware built from an async closure.
pub struct FnMiddleware<F> {
    name: String,
    kinds: Vec<EventKind>,
    f: F,
}

/// Creates a middleware from an async closure.
pub fn middleware_fn<F, Fut>(
    name: impl Into<String>,
    kinds: impl IntoIterator<Item = EventKind>,
    f: F,
) -> FnMiddleware<F>
where
    F: Fn(Arc<IcqContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
{
    FnMiddleware {
        name: name.into(),
        kinds: kinds.into_iter().collect(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Arc<IcqContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn event_kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    async fn check(&self, ctx: Arc<IcqContext>) -> Result<bool, BoxError> {
        (self.f)(ctx).await
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Outcome of running an event through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// No middleware objected.
    Pass,
    /// A middleware answered `true`.
    Suppressed {
        /// Name of the suppressing middleware.
        by: String,
    },
}

impl GateVerdict {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed { .. })
    }
}

/// Ordered middleware chain.
#[derive(Default, Clone)]
pub struct MiddlewareGate {
    middleware: Vec<BoxedMiddleware>,
}

impl MiddlewareGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it is consulted after the ones already added.
    pub fn add(&mut self, middleware: impl Middleware) {
        self.middleware.push(Arc::new(middleware));
    }

    /// Appends a middleware (builder pattern).
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.add(middleware);
        self
    }

    pub fn add_boxed(&mut self, middleware: BoxedMiddleware) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs the event through every middleware declared for its kind.
    pub async fn evaluate(&self, ctx: &Arc<IcqContext>) -> GateVerdict {
        let kind = ctx.kind();

        for middleware in &self.middleware {
            if !middleware.event_kinds().contains(&kind) {
                continue;
            }

            trace!(middleware = middleware.name(), "Consulting middleware");
            let outcome = AssertUnwindSafe(middleware.check(Arc::clone(ctx)))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(true)) => {
                    debug!(
                        middleware = middleware.name(),
                        event_id = ctx.event_id(),
                        "Event suppressed by middleware"
                    );
                    return GateVerdict::Suppressed {
                        by: middleware.name().to_string(),
                    };
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    error!(
                        middleware = middleware.name(),
                        event_id = ctx.event_id(),
                        kind = %kind,
                        "Middleware failed, not suppressing: {e}"
                    );
                }
                Err(_) => {
                    error!(
                        middleware = middleware.name(),
                        event_id = ctx.event_id(),
                        kind = %kind,
                        "Middleware panicked, not suppressing"
                    );
                }
            }
        }

        GateVerdict::Pass
    }
}

impl std::fmt::Debug for MiddlewareGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.middleware.iter().map(|m| m.name()).collect();
        f.debug_struct("MiddlewareGate")
            .field("middleware", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::context::tests::{RecordingBot, message};

    fn ctx(kind: EventKind, text: &str) -> Arc<IcqContext> {
        Arc::new(IcqContext::new(
            1,
            message(kind, text),
            Arc::new(RecordingBot::default()),
        ))
    }

    /// Answers `verdict` and counts how often it was asked.
    fn counting(
        name: &'static str,
        kinds: Vec<EventKind>,
        verdict: bool,
    ) -> (Arc<AtomicUsize>, impl Middleware) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let middleware = middleware_fn(name, kinds, move |_ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<bool, BoxError>(verdict)
            }
        });
        (hits, middleware)
    }

    #[tokio::test]
    async fn test_first_true_suppresses_and_stops() {
        let (m1_hits, m1) = counting("m1", vec![EventKind::NewMessage], true);
        let (m2_hits, m2) = counting("m2", vec![EventKind::NewMessage], false);
        let gate = MiddlewareGate::new().with(m1).with(m2);

        let verdict = gate.evaluate(&ctx(EventKind::NewMessage, "hi")).await;

        assert_eq!(verdict, GateVerdict::Suppressed { by: "m1".into() });
        assert_eq!(m1_hits.load(Ordering::SeqCst), 1);
        assert_eq!(m2_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undeclared_kind_is_not_consulted() {
        let (hits, callback_only) = counting("cb", vec![EventKind::CallbackQuery], true);
        let gate = MiddlewareGate::new().with(callback_only);

        let verdict = gate.evaluate(&ctx(EventKind::NewMessage, "hi")).await;

        assert_eq!(verdict, GateVerdict::Pass);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_false_passes() {
        let (a_hits, a) = counting("a", vec![EventKind::NewMessage], false);
        let (b_hits, b) = counting("b", vec![EventKind::NewMessage, EventKind::EditedMessage], false);
        let gate = MiddlewareGate::new().with(a).with(b);

        assert!(!gate.evaluate(&ctx(EventKind::NewMessage, "hi")).await.is_suppressed());
        assert_eq!(a_hits.load(Ordering::SeqCst), 1);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_faulty_middleware_does_not_suppress() {
        let failing = middleware_fn("failing", [EventKind::NewMessage], |_ctx| async {
            Err::<bool, BoxError>("database unavailable".into())
        });
        let panicking = middleware_fn(
            "panicking",
            [EventKind::NewMessage],
            |ctx: Arc<IcqContext>| async move {
                if ctx.event_id() > 0 {
                    panic!("middleware bug");
                }
                Ok::<bool, BoxError>(false)
            },
        );
        let (hits, last) = counting("last", vec![EventKind::NewMessage], false);
        let gate = MiddlewareGate::new().with(failing).with(panicking).with(last);

        let verdict = gate.evaluate(&ctx(EventKind::NewMessage, "hi")).await;

        assert_eq!(verdict, GateVerdict::Pass);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_predicate_sees_event() {
        let spam = middleware_fn("spam", [EventKind::NewMessage], |ctx: Arc<IcqContext>| async move {
            Ok::<bool, BoxError>(ctx.text().is_some_and(|t| t.contains("spam")))
        });
        let gate = MiddlewareGate::new().with(spam);

        assert!(gate.evaluate(&ctx(EventKind::NewMessage, "buy spam")).await.is_suppressed());
        assert!(!gate.evaluate(&ctx(EventKind::NewMessage, "hello")).await.is_suppressed());
    }
}
