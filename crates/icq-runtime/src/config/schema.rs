//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use icq_core::ParseMode;
use icq_framework::HelpConfig;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IcqConfig {
    /// Bot credentials and connection settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Poll loop settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Built-in help command.
    #[serde(default)]
    pub help: HelpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot credentials and connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Token issued by the vendor's bot registry.
    #[serde(default)]
    pub token: String,

    /// Server base URL, without the `/bot/v1/` suffix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Parse mode for calls that do not choose one.
    #[serde(default)]
    pub parse_mode: ParseMode,

    /// Proxy URL for every request.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Timeout for ordinary API calls in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            parse_mode: ParseMode::default(),
            proxy: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("parse_mode", &self.parse_mode)
            .field("proxy", &self.proxy)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl BotConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_url() -> String {
    icq_transport::DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Polling
// =============================================================================

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Cursor to start from.
    #[serde(default)]
    pub last_event_id: i64,

    /// Long-poll hold time sent as `pollTime`, in seconds.
    #[serde(default = "default_poll_time_secs")]
    pub poll_time_secs: u64,

    /// Extra seconds the fetch request may take beyond the poll time.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,

    /// Abandon a handler invocation after this many milliseconds.
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,

    /// Log events dropped by middleware.
    #[serde(default = "default_true")]
    pub log_suppressed: bool,

    /// Backoff after failed fetches.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            last_event_id: 0,
            poll_time_secs: default_poll_time_secs(),
            grace_secs: default_grace_secs(),
            handler_timeout_ms: None,
            log_suppressed: true,
            retry: RetryConfig::default(),
        }
    }
}

impl PollingConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}

fn default_poll_time_secs() -> u64 {
    30
}

fn default_grace_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following `failures` consecutive failures.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(64) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `icq_transport = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of the log statement.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Let hyper, h2 and reqwest log below `warn`. Off by default since every
    /// long-poll connection shows up at debug level.
    #[serde(default)]
    pub http_wire: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            filters: BTreeMap::new(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            http_wire: false,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[cfg(feature = "json-log")]
    Json,
    #[default]
    Compact,
    Full,
    Pretty,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IcqConfig::default();
        assert_eq!(config.bot.api_url, "https://myteam.mail.ru");
        assert_eq!(config.bot.parse_mode, ParseMode::Html);
        assert_eq!(config.polling.last_event_id, 0);
        assert_eq!(config.polling.poll_time_secs, 30);
        assert_eq!(config.polling.handler_timeout(), None);
        assert!(config.polling.log_suppressed);
        assert!(!config.help.enabled);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        let retry = RetryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 3.0,
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for(2), Duration::from_millis(300));
        assert_eq!(retry.delay_for(3), Duration::from_millis(900));
        assert_eq!(retry.delay_for(4), Duration::from_millis(1000));
        assert_eq!(retry.delay_for(200), Duration::from_millis(1000));
    }

    #[test]
    fn test_token_is_not_debug_printed() {
        let bot = BotConfig {
            token: "001.secret".into(),
            ..BotConfig::default()
        };
        assert!(!format!("{bot:?}").contains("001.secret"));
    }

    #[test]
    fn test_partial_sections_take_defaults() {
        let config: IcqConfig = serde_json::from_value(serde_json::json!({
            "bot": { "token": "t" },
            "polling": { "retry": { "max_delay_ms": 5000 } },
            "help": { "enabled": true, "mode": "additive" }
        }))
        .unwrap();

        assert_eq!(config.bot.timeout_secs, 30);
        assert_eq!(config.polling.retry.initial_delay_ms, 1000);
        assert_eq!(config.polling.retry.max_delay_ms, 5000);
        assert_eq!(config.help.token, "/help");
    }
}
