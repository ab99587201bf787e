//! The runtime facade.
//!
//! [`IcqRuntime`] ties configuration, logging, the HTTP transport and the
//! poll engine together.
//!
//! ```rust,ignore
//! use icq_runtime::IcqRuntime;
//! use icq_framework::{on_command, on_message};
//!
//! let runtime = IcqRuntime::builder()
//!     .config_file("config/icq.toml")
//!     .profile("production")
//!     .build()?;
//!
//! runtime.register(on_message().handler(echo))?;
//! runtime.register(on_command("/weather").description("Forecast").handler(weather))?;
//! runtime.run().await?;
//! ```
//!
//! Middleware and registrations are collected until the runtime starts. At
//! that point they are moved into the dispatcher and further registration
//! fails with [`RuntimeError::AlreadyStarted`].

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use icq_core::BoxedBot;
use icq_framework::{Dispatcher, HandlerRegistry, Middleware, MiddlewareGate, Registration};
use icq_transport::{HttpBot, HttpBotConfig};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::signal;
use tracing::{error, info};

use crate::config::{ConfigLoader, IcqConfig, validate_config};
use crate::engine::{Poller, StopHandle};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Runs a bot until it is told to stop.
pub struct IcqRuntime {
    config: IcqConfig,
    bot: BoxedBot,
    gate: Mutex<MiddlewareGate>,
    registry: Mutex<HandlerRegistry>,
    started: AtomicBool,
    stop: StopHandle,
}

impl IcqRuntime {
    /// Loads configuration from the default locations and builds the runtime.
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config`, initializes logging and connects an [`HttpBot`].
    pub fn from_config(config: IcqConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        let bot = HttpBot::new(http_config(&config))?;
        info!(
            api_url = %config.bot.api_url,
            parse_mode = %config.bot.parse_mode,
            log_level = %config.logging.level,
            "ICQ runtime initialized"
        );

        Ok(Self::with_bot(config, Arc::new(bot)))
    }

    /// Uses a caller-supplied bot; no validation or logging setup happens.
    pub fn with_bot(config: IcqConfig, bot: BoxedBot) -> Self {
        Self {
            config,
            bot,
            gate: Mutex::new(MiddlewareGate::new()),
            registry: Mutex::new(HandlerRegistry::new()),
            started: AtomicBool::new(false),
            stop: StopHandle::new(),
        }
    }

    pub fn config(&self) -> &IcqConfig {
        &self.config
    }

    /// The bot handle, for calls made outside of handlers.
    pub fn bot(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }

    /// Handle that stops the poll loop after its current iteration.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Appends a middleware to the gate.
    pub fn add_middleware(&self, middleware: impl Middleware) -> RuntimeResult<()> {
        self.ensure_not_started()?;
        self.gate.lock().add(middleware);
        Ok(())
    }

    /// Adds a handler registration.
    pub fn register(&self, registration: Registration) -> RuntimeResult<()> {
        self.ensure_not_started()?;
        self.registry.lock().register(registration)?;
        Ok(())
    }

    /// Polls until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("ICQ runtime is now running. Press Ctrl+C to stop.");

        let mut signal_error = None;
        self.run_until(async {
            if let Err(e) = wait_for_shutdown().await {
                error!("Failed to listen for shutdown signals: {e}");
                signal_error = Some(e);
            }
        })
        .await?;

        match signal_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Polls until `shutdown` resolves or the stop handle is used.
    ///
    /// A batch in dispatch when the stop arrives still completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut poller = self.start()?;
        let stop = self.stop.clone();

        let watcher = async {
            tokio::select! {
                _ = shutdown => {
                    info!("Shutdown requested, finishing current iteration");
                    stop.stop();
                }
                _ = stop.stopped() => {}
            }
        };

        tokio::join!(poller.run(), watcher);
        info!(cursor = poller.cursor(), "ICQ runtime stopped");
        Ok(())
    }

    fn ensure_not_started(&self) -> RuntimeResult<()> {
        if self.is_started() {
            return Err(RuntimeError::AlreadyStarted);
        }
        Ok(())
    }

    /// Freezes registrations into a poller.
    fn start(&self) -> RuntimeResult<Poller> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyStarted);
        }

        let registry = std::mem::take(&mut *self.registry.lock());
        let gate = std::mem::take(&mut *self.gate.lock());
        let polling = &self.config.polling;

        let dispatcher = Dispatcher::new(registry)
            .with_gate(gate)
            .with_help(self.config.help.clone())
            .handler_timeout(polling.handler_timeout())
            .log_suppressed(polling.log_suppressed);

        Ok(Poller::new(Arc::clone(&self.bot), dispatcher, polling)
            .with_stop_handle(self.stop.clone()))
    }
}

impl std::fmt::Debug for IcqRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcqRuntime")
            .field("config", &self.config)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

fn http_config(config: &IcqConfig) -> HttpBotConfig {
    let bot = &config.bot;
    let http = HttpBotConfig::new(bot.token.clone())
        .api_url(bot.api_url.clone())
        .timeout(bot.timeout())
        .poll_grace(config.polling.grace())
        .parse_mode(bot.parse_mode);

    match &bot.proxy {
        Some(proxy) => http.proxy(proxy.clone()),
        None => http,
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for an [`IcqRuntime`] with custom configuration sources.
///
/// ```rust,ignore
/// let runtime = IcqRuntime::builder()
///     .config_file("config/icq.toml")
///     .set("polling.handler_timeout_ms", 30_000)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    bot: Option<BoxedBot>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            bot: None,
        }
    }

    /// Loads this file instead of searching for one.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Overrides a dotted configuration key.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.loader = self.loader.set(key, value);
        self
    }

    /// Shorthand for `set("bot.token", token)`.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.set("bot.token", token.into())
    }

    /// Uses `bot` instead of connecting an [`HttpBot`].
    pub fn bot(mut self, bot: BoxedBot) -> Self {
        self.bot = Some(bot);
        self
    }

    pub fn build(self) -> RuntimeResult<IcqRuntime> {
        let config = self.loader.load()?;
        match self.bot {
            Some(bot) => {
                logging::init_from_config(&config.logging);
                Ok(IcqRuntime::with_bot(config, bot))
            }
            None => IcqRuntime::from_config(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use icq_core::{EventKind, ParseMode};
    use icq_framework::{BoxError, IcqContext, middleware_fn, on_command, on_message};

    use super::*;
    use crate::config::ConfigError;
    use crate::engine::tests::{HangingBot, ScriptedBot, batch};

    fn scripted(script: Vec<icq_core::ApiResult<icq_core::EventBatch>>) -> (Arc<ScriptedBot>, IcqRuntime) {
        let bot = Arc::new(ScriptedBot::new(script));
        let runtime = IcqRuntime::with_bot(IcqConfig::default(), bot.clone());
        bot.stop_when_done(runtime.stop_handle());
        (bot, runtime)
    }

    #[tokio::test]
    async fn test_runs_handlers_until_script_ends() {
        let (bot, runtime) = scripted(vec![batch(&[1, 2]), batch(&[3])]);
        runtime
            .register(on_message().handler(|ctx: Arc<IcqContext>| async move {
                ctx.answer("seen").await.map(|_| ())
            }))
            .unwrap();
        runtime
            .add_middleware(middleware_fn(
                "drop-second",
                [EventKind::NewMessage],
                |ctx: Arc<IcqContext>| async move { Ok::<bool, BoxError>(ctx.event_id() == 2) },
            ))
            .unwrap();

        runtime.run_until(std::future::pending()).await.unwrap();

        assert_eq!(bot.calls().len(), 2);
        assert_eq!(bot.cursors(), vec![0, 2, 3]);
        assert!(runtime.stop_handle().is_stopped());
    }

    #[tokio::test]
    async fn test_registrations_freeze_on_start() {
        let (_bot, runtime) = scripted(Vec::new());
        runtime.run_until(std::future::pending()).await.unwrap();

        let late = runtime.register(on_message().handler(|| async {}));
        assert!(matches!(late, Err(RuntimeError::AlreadyStarted)));
        assert!(matches!(
            runtime.run_until(std::future::pending()).await,
            Err(RuntimeError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_invalid_registration_is_reported() {
        let (_bot, runtime) = scripted(Vec::new());
        let err = runtime
            .register(on_command("").handler(|| async {}))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Registration(_)));
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_pending_poll() {
        let runtime = IcqRuntime::with_bot(IcqConfig::default(), Arc::new(HangingBot));

        let finished = tokio::time::timeout(
            Duration::from_secs(1),
            runtime.run_until(tokio::time::sleep(Duration::from_millis(20))),
        )
        .await;

        assert!(matches!(finished, Ok(Ok(()))));
        assert!(runtime.stop_handle().is_stopped());
    }

    #[test]
    fn test_from_config_requires_token() {
        let err = IcqRuntime::from_config(IcqConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_from_config_connects_http_bot() {
        let mut config = IcqConfig::default();
        config.bot.token = "001.token".into();
        config.bot.parse_mode = ParseMode::MarkdownV2;

        let runtime = IcqRuntime::from_config(config).unwrap();

        assert_eq!(runtime.bot().parse_mode(), ParseMode::MarkdownV2);
        assert!(!runtime.is_started());
    }

    #[test]
    fn test_builder_with_custom_bot() {
        let runtime = IcqRuntime::builder()
            .without_env()
            .search_path("/nonexistent/icq")
            .set("polling.last_event_id", 17)
            .bot(Arc::new(HangingBot))
            .build()
            .unwrap();

        assert_eq!(runtime.config().polling.last_event_id, 17);
    }
}
