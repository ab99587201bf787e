//! Batch dispatcher for the ICQ framework.
//!
//! The [`Dispatcher`] takes one fetched [`EventBatch`] at a time:
//!
//! 1. every envelope is decoded on its own; undecodable ones are logged and
//!    dropped without affecting the rest of the batch;
//! 2. each decoded event runs through the [`MiddlewareGate`]; suppressed
//!    events go no further;
//! 3. the event is routed to every matching registration (and to the help
//!    listing when enabled), each match spawned as its own task;
//! 4. once the whole batch has been scheduled, all tasks are joined.
//!
//! Handler errors, panics and timeouts are caught at the task boundary,
//! logged with the event's id, kind and chat, and counted in the
//! [`BatchReport`]. Nothing inside a batch can fail the dispatch itself.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(registry)
//!     .with_gate(gate)
//!     .with_help(HelpConfig::enabled())
//!     .handler_timeout(Some(Duration::from_secs(30)));
//!
//! let batch = bot.fetch_events(cursor, 30).await?;
//! let report = dispatcher.dispatch_batch(&batch, &bot).await;
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use icq_core::{BoxedBot, EventBatch};
use tokio::task::JoinSet;
use tracing::{Instrument, Level, Span, debug, error, info, span, trace, warn};

use crate::context::IcqContext;
use crate::handler::Outcome;
use crate::help::{HelpConfig, HelpMode};
use crate::middleware::{GateVerdict, MiddlewareGate};
use crate::registry::HandlerRegistry;

/// Counters for one dispatched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Envelopes in the batch.
    pub received: usize,
    /// Envelopes dropped because they could not be decoded.
    pub undecodable: usize,
    /// Events vetoed by middleware.
    pub suppressed: usize,
    /// Handler invocations scheduled.
    pub invocations: usize,
    /// Invocations whose parameters did not fit the event.
    pub skipped: usize,
    /// Invocations that returned an error, panicked, timed out or were aborted.
    pub failed: usize,
}

/// Routes decoded events through the gate to their handlers.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    gate: MiddlewareGate,
    help: HelpConfig,
    handler_timeout: Option<Duration>,
    log_suppressed: bool,
}

impl Dispatcher {
    /// Creates a dispatcher over a frozen registry.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            gate: MiddlewareGate::new(),
            help: HelpConfig::default(),
            handler_timeout: None,
            log_suppressed: true,
        }
    }

    pub fn with_gate(mut self, gate: MiddlewareGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_help(mut self, help: HelpConfig) -> Self {
        self.help = help;
        self
    }

    /// Abandons invocations running longer than `timeout`.
    pub fn handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Whether suppressed events are logged at info level.
    pub fn log_suppressed(mut self, enabled: bool) -> Self {
        self.log_suppressed = enabled;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &MiddlewareGate {
        &self.gate
    }

    /// Dispatches a batch and waits for every invocation it started.
    pub async fn dispatch_batch(&self, batch: &EventBatch, bot: &BoxedBot) -> BatchReport {
        let mut report = BatchReport {
            received: batch.len(),
            ..BatchReport::default()
        };
        let mut tasks = JoinSet::new();

        for envelope in &batch.events {
            let decoded = envelope.id().and_then(|id| Ok((id, envelope.decode()?)));
            let (event_id, event) = match decoded {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(event_id = ?envelope.event_id, "Dropping undecodable event: {e}");
                    report.undecodable += 1;
                    continue;
                }
            };

            let ctx = Arc::new(IcqContext::new(event_id, event, Arc::clone(bot)));
            let span = span!(
                Level::DEBUG,
                "dispatch",
                event_id = ctx.event_id(),
                kind = %ctx.kind()
            );

            let verdict = self.gate.evaluate(&ctx).instrument(span.clone()).await;
            if let GateVerdict::Suppressed { by } = verdict {
                report.suppressed += 1;
                if self.log_suppressed {
                    info!(parent: &span, middleware = %by, chat_id = %ctx.chat_id(), "Event suppressed");
                }
                continue;
            }

            report.invocations += self.schedule(&ctx, &span, &mut tasks);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::Skipped) => report.skipped += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Err(e) => {
                    error!("Handler task aborted: {e}");
                    report.failed += 1;
                }
            }
        }

        debug!(
            received = report.received,
            invocations = report.invocations,
            skipped = report.skipped,
            failed = report.failed,
            "Batch dispatched"
        );
        report
    }

    /// Spawns every invocation the event routes to; returns how many.
    fn schedule(
        &self,
        ctx: &Arc<IcqContext>,
        span: &Span,
        tasks: &mut JoinSet<Outcome>,
    ) -> usize {
        let mut scheduled = 0;

        if self.help.is_request(ctx.event()) {
            let listing = self.help.render(&self.registry);
            let help_ctx = Arc::clone(ctx);
            let answer = async move {
                match help_ctx.answer(&listing).await {
                    Ok(_) => Outcome::Completed,
                    Err(e) => {
                        error!(chat_id = %help_ctx.chat_id(), "Failed to send help: {e}");
                        Outcome::Failed
                    }
                }
            };
            self.spawn(tasks, "help", ctx, answer.boxed(), span);
            scheduled += 1;

            if self.help.mode == HelpMode::ShortCircuit {
                return scheduled;
            }
        }

        for registration in self.registry.route(ctx.event()) {
            trace!(parent: span, handler = registration.name(), "Scheduling handler");
            let invocation = (registration.handler())(Arc::clone(ctx));
            self.spawn(tasks, registration.name(), ctx, invocation, span);
            scheduled += 1;
        }

        if scheduled == 0 {
            trace!(parent: span, "No handler matched");
        }
        scheduled
    }

    fn spawn(
        &self,
        tasks: &mut JoinSet<Outcome>,
        name: &str,
        ctx: &Arc<IcqContext>,
        invocation: BoxFuture<'static, Outcome>,
        span: &Span,
    ) {
        let name = name.to_string();
        let event_id = ctx.event_id();
        let kind = ctx.kind();
        let chat_id = ctx.chat_id().to_string();
        let limit = self.handler_timeout;

        let task = async move {
            let guarded = AssertUnwindSafe(invocation).catch_unwind();
            let outcome = match limit {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(
                            handler = %name,
                            event_id,
                            kind = %kind,
                            chat_id = %chat_id,
                            timeout_ms = limit.as_millis() as u64,
                            "Handler timed out"
                        );
                        return Outcome::Failed;
                    }
                },
                None => guarded.await,
            };

            match outcome {
                Ok(outcome) => outcome,
                Err(panic) => {
                    error!(
                        handler = %name,
                        event_id,
                        kind = %kind,
                        chat_id = %chat_id,
                        "Handler panicked: {}",
                        panic_message(panic.as_ref())
                    );
                    Outcome::Failed
                }
            }
        };

        tasks.spawn(task.instrument(span.clone()));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registrations", &self.registry.len())
            .field("middleware", &self.gate.len())
            .field("help", &self.help.enabled)
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}
