//! The long-polling engine.
//!
//! A [`Poller`] owns the cursor and runs one iteration at a time:
//!
//! 1. fetch `events/get` with the current cursor;
//! 2. on a non-empty batch, advance the cursor to the batch's last event id;
//! 3. hand the batch to the [`Dispatcher`] and wait until every handler
//!    invocation it started has finished.
//!
//! A long-poll timeout is logged and retried immediately with the same
//! cursor. Any other fetch failure is logged and retried after an exponential
//! backoff that resets on the next successful fetch. Stopping takes effect
//! between iterations: a pending fetch or backoff is abandoned, a batch in
//! dispatch always completes.

use std::time::Duration;

use icq_core::{ApiResult, BoxedBot, EventBatch};
use icq_framework::{BatchReport, Dispatcher};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, error, info, span, trace, warn};

use crate::config::{PollingConfig, RetryConfig};

/// Clears the engine's running flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the engine to stop after the current iteration.
    pub fn stop(&self) {
        self.0.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        self.0.cancelled().await;
    }
}

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A non-empty batch was dispatched.
    Dispatched(BatchReport),
    /// The server answered with no events.
    Empty,
    /// The long poll timed out; retry at once.
    TimedOut,
    /// The fetch failed; retry after `retry_in`.
    Failed { retry_in: Duration },
}

/// Drives fetch, dispatch and cursor advance.
pub struct Poller {
    bot: BoxedBot,
    dispatcher: Dispatcher,
    cursor: i64,
    poll_time: u64,
    retry: RetryConfig,
    failures: u32,
    stop: StopHandle,
}

impl Poller {
    pub fn new(bot: BoxedBot, dispatcher: Dispatcher, polling: &PollingConfig) -> Self {
        Self {
            bot,
            dispatcher,
            cursor: polling.last_event_id,
            poll_time: polling.poll_time_secs,
            retry: polling.retry.clone(),
            failures: 0,
            stop: StopHandle::new(),
        }
    }

    /// Uses an existing handle instead of a fresh one.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The event id the next fetch will send as `lastEventId`.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Polls until stopped.
    pub async fn run(&mut self) {
        info!(
            cursor = self.cursor,
            poll_time = self.poll_time,
            handlers = self.dispatcher.registry().len(),
            "Polling started"
        );

        while !self.stop.is_stopped() {
            let span = span!(Level::DEBUG, "poll", cursor = self.cursor);
            if !self.iterate().instrument(span).await {
                break;
            }
        }

        info!(cursor = self.cursor, "Polling stopped");
    }

    /// Runs one iteration, including any backoff. Returns `false` when a
    /// stop request interrupted it.
    async fn iterate(&mut self) -> bool {
        let fetched = tokio::select! {
            biased;
            _ = self.stop.stopped() => return false,
            fetched = self.bot.fetch_events(self.cursor, self.poll_time) => fetched,
        };

        if let IterationOutcome::Failed { retry_in } = self.handle(fetched).await {
            tokio::select! {
                biased;
                _ = self.stop.stopped() => return false,
                _ = tokio::time::sleep(retry_in) => {}
            }
        }
        true
    }

    /// Fetches and dispatches one batch without sleeping on failure.
    pub async fn poll_once(&mut self) -> IterationOutcome {
        let fetched = self.bot.fetch_events(self.cursor, self.poll_time).await;
        self.handle(fetched).await
    }

    async fn handle(&mut self, fetched: ApiResult<EventBatch>) -> IterationOutcome {
        match fetched {
            Ok(batch) => {
                self.failures = 0;
                if batch.is_empty() {
                    trace!(cursor = self.cursor, "No new events");
                    return IterationOutcome::Empty;
                }

                match batch.last_event_id() {
                    Some(last) => {
                        debug!(
                            events = batch.len(),
                            from = self.cursor,
                            to = last,
                            "Batch received"
                        );
                        self.cursor = last;
                    }
                    None => warn!(
                        events = batch.len(),
                        cursor = self.cursor,
                        "Batch carries no usable event id, cursor unchanged"
                    ),
                }

                let report = self.dispatcher.dispatch_batch(&batch, &self.bot).await;
                if report.failed > 0 || report.undecodable > 0 {
                    warn!(
                        invocations = report.invocations,
                        failed = report.failed,
                        undecodable = report.undecodable,
                        "Batch finished with errors"
                    );
                } else {
                    debug!(
                        invocations = report.invocations,
                        skipped = report.skipped,
                        suppressed = report.suppressed,
                        "Batch finished"
                    );
                }
                IterationOutcome::Dispatched(report)
            }
            Err(e) if e.is_timeout() => {
                warn!(cursor = self.cursor, "Long poll timed out, retrying");
                IterationOutcome::TimedOut
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                let retry_in = self.retry.delay_for(self.failures);
                error!(
                    cursor = self.cursor,
                    failures = self.failures,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Fetching events failed: {e}"
                );
                IterationOutcome::Failed { retry_in }
            }
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("cursor", &self.cursor)
            .field("poll_time", &self.poll_time)
            .field("failures", &self.failures)
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use icq_core::{ApiError, Bot, FileUpload, Query};
    use icq_framework::{HandlerRegistry, IcqContext, on_message};
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;

    /// Answers fetches from a script; stops the engine once it runs dry.
    #[derive(Default)]
    pub(crate) struct ScriptedBot {
        script: Mutex<VecDeque<ApiResult<EventBatch>>>,
        cursors: Mutex<Vec<i64>>,
        calls: Mutex<Vec<String>>,
        stop: Mutex<Option<StopHandle>>,
    }

    impl ScriptedBot {
        pub(crate) fn new(script: Vec<ApiResult<EventBatch>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            }
        }

        pub(crate) fn stop_when_done(&self, stop: StopHandle) {
            *self.stop.lock() = Some(stop);
        }

        pub(crate) fn cursors(&self) -> Vec<i64> {
            self.cursors.lock().clone()
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Bot for ScriptedBot {
        async fn call(&self, method: &str, _query: Query) -> ApiResult<Value> {
            self.calls.lock().push(method.to_string());
            Ok(json!({ "ok": true, "msgId": "1" }))
        }

        async fn upload(&self, method: &str, query: Query, _file: FileUpload) -> ApiResult<Value> {
            self.call(method, query).await
        }

        async fn fetch_events(&self, last_event_id: i64, _poll_time: u64) -> ApiResult<EventBatch> {
            self.cursors.lock().push(last_event_id);
            let next = self.script.lock().pop_front();
            match next {
                Some(result) => result,
                None => {
                    if let Some(stop) = self.stop.lock().as_ref() {
                        stop.stop();
                    }
                    Ok(EventBatch::default())
                }
            }
        }
    }

    pub(crate) fn batch(ids: &[i64]) -> ApiResult<EventBatch> {
        let events: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "eventId": id,
                    "type": "newMessage",
                    "payload": {
                        "chat": { "chatId": "chat@chat.agent", "type": "group" },
                        "from": { "userId": "user@corp", "firstName": "Ann" },
                        "msgId": format!("m{id}"),
                        "timestamp": 1_546_290_000,
                        "text": format!("message {id}")
                    }
                })
            })
            .collect();
        Ok(serde_json::from_value(json!({ "events": events })).unwrap())
    }

    fn poller(bot: &Arc<ScriptedBot>, registry: HandlerRegistry) -> Poller {
        let boxed: BoxedBot = bot.clone();
        let poller = Poller::new(boxed, Dispatcher::new(registry), &PollingConfig::default());
        bot.stop_when_done(poller.stop_handle());
        poller
    }

    #[tokio::test]
    async fn test_cursor_follows_last_event_of_batch() {
        let bot = Arc::new(ScriptedBot::new(vec![
            batch(&[5, 6]),
            Ok(EventBatch::default()),
            Err(ApiError::Timeout),
            batch(&[9]),
        ]));
        let mut poller = poller(&bot, HandlerRegistry::new());

        poller.run().await;

        assert_eq!(bot.cursors(), vec![0, 6, 6, 6, 9]);
        assert_eq!(poller.cursor(), 9);
    }

    #[tokio::test]
    async fn test_cursor_takes_last_not_largest_id() {
        let bot = Arc::new(ScriptedBot::new(vec![batch(&[12, 10])]));
        let mut poller = poller(&bot, HandlerRegistry::new());

        let outcome = poller.poll_once().await;

        assert!(matches!(outcome, IterationOutcome::Dispatched(_)));
        assert_eq!(poller.cursor(), 10);
    }

    #[tokio::test]
    async fn test_malformed_envelope_does_not_stall_cursor() {
        let mut events = batch(&[4]).unwrap();
        events
            .events
            .push(serde_json::from_value(json!({ "eventId": 5, "payload": {} })).unwrap());
        let bot = Arc::new(ScriptedBot::new(vec![Ok(events), batch(&[6])]));
        let registry = HandlerRegistry::new()
            .with(on_message().handler(|ctx: Arc<IcqContext>| async move {
                ctx.answer("seen").await.map(|_| ())
            }))
            .unwrap();
        let mut poller = poller(&bot, registry);

        let IterationOutcome::Dispatched(report) = poller.poll_once().await else {
            panic!("expected the batch to be dispatched");
        };
        assert_eq!((report.received, report.undecodable), (2, 1));
        assert_eq!(poller.cursor(), 5);

        poller.poll_once().await;
        assert_eq!(bot.cursors(), vec![0, 5]);
        assert_eq!(poller.cursor(), 6);
        assert_eq!(bot.calls(), vec!["messages/sendText", "messages/sendText"]);
    }

    #[tokio::test]
    async fn test_batch_without_ids_is_dispatched_in_place() {
        let anonymous: EventBatch =
            serde_json::from_value(json!({ "events": [{ "type": "newMessage", "payload": {} }] }))
                .unwrap();
        let bot = Arc::new(ScriptedBot::new(vec![Ok(anonymous)]));
        let mut poller = poller(&bot, HandlerRegistry::new());

        let IterationOutcome::Dispatched(report) = poller.poll_once().await else {
            panic!("expected the batch to be dispatched");
        };
        assert_eq!(report.undecodable, 1);
        assert_eq!(poller.cursor(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_timeout_keep_cursor() {
        let bot = Arc::new(ScriptedBot::new(vec![
            Ok(EventBatch::default()),
            Err(ApiError::Timeout),
        ]));
        let mut poller = poller(&bot, HandlerRegistry::new());

        assert_eq!(poller.poll_once().await, IterationOutcome::Empty);
        assert_eq!(poller.poll_once().await, IterationOutcome::TimedOut);
        assert_eq!(poller.cursor(), 0);
    }

    #[tokio::test]
    async fn test_backoff_grows_and_resets() {
        let bot = Arc::new(ScriptedBot::new(vec![
            Err(ApiError::transport("connection refused")),
            Err(ApiError::ApiCallFailed {
                status: 502,
                body: "bad gateway".into(),
            }),
            batch(&[1]),
            Err(ApiError::transport("connection reset")),
        ]));
        let mut poller = poller(&bot, HandlerRegistry::new());

        let second = Duration::from_millis(1000);
        assert_eq!(poller.poll_once().await, IterationOutcome::Failed { retry_in: second });
        assert_eq!(poller.poll_once().await, IterationOutcome::Failed { retry_in: second * 2 });
        assert!(matches!(poller.poll_once().await, IterationOutcome::Dispatched(_)));
        assert_eq!(poller.poll_once().await, IterationOutcome::Failed { retry_in: second });
        assert_eq!(poller.cursor(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_fetch_failure() {
        let bot = Arc::new(ScriptedBot::new(vec![
            Err(ApiError::transport("connection refused")),
            batch(&[3]),
        ]));
        let mut poller = poller(&bot, HandlerRegistry::new());

        poller.run().await;

        assert_eq!(bot.cursors(), vec![0, 0, 3]);
    }

    #[tokio::test]
    async fn test_loop_survives_handler_panic() {
        let bot = Arc::new(ScriptedBot::new(vec![batch(&[1]), batch(&[2])]));
        let registry = HandlerRegistry::new()
            .with(on_message().name("panics").handler(|ctx: Arc<IcqContext>| async move {
                if ctx.event_id() == 1 {
                    panic!("handler bug");
                }
            }))
            .and_then(|r| {
                r.with(on_message().name("answers").handler(|ctx: Arc<IcqContext>| async move {
                    ctx.answer("ok").await.map(|_| ())
                }))
            })
            .unwrap();
        let mut poller = poller(&bot, registry);

        let first = poller.poll_once().await;
        let second = poller.poll_once().await;

        let IterationOutcome::Dispatched(first) = first else {
            panic!("expected dispatch, got {first:?}");
        };
        let IterationOutcome::Dispatched(second) = second else {
            panic!("expected dispatch, got {second:?}");
        };
        assert_eq!((first.invocations, first.failed), (2, 1));
        assert_eq!((second.invocations, second.failed), (2, 0));
        assert_eq!(bot.calls(), vec!["messages/sendText", "messages/sendText"]);
        assert_eq!(poller.cursor(), 2);
    }

    /// Never answers a fetch.
    pub(crate) struct HangingBot;

    #[async_trait]
    impl Bot for HangingBot {
        async fn call(&self, _method: &str, _query: Query) -> ApiResult<Value> {
            Ok(json!({ "ok": true }))
        }

        async fn upload(&self, _method: &str, _query: Query, _file: FileUpload) -> ApiResult<Value> {
            Ok(json!({ "ok": true }))
        }

        async fn fetch_events(&self, _last_event_id: i64, _poll_time: u64) -> ApiResult<EventBatch> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stop_interrupts_pending_fetch() {
        let mut poller = Poller::new(
            Arc::new(HangingBot),
            Dispatcher::new(HandlerRegistry::new()),
            &PollingConfig::default(),
        );
        let stop = poller.stop_handle();

        let run = tokio::spawn(async move {
            poller.run().await;
            poller.cursor()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.stop();

        let cursor = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("engine did not stop")
            .unwrap();
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_starts_from_configured_cursor() {
        let polling = PollingConfig {
            last_event_id: 41,
            ..PollingConfig::default()
        };
        let poller = Poller::new(
            Arc::new(HangingBot),
            Dispatcher::new(HandlerRegistry::new()),
            &polling,
        );
        assert_eq!(poller.cursor(), 41);
    }
}
