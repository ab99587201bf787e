//! Connection settings of [`HttpBot`](super::HttpBot).

use std::fmt;
use std::time::Duration;

use icq_core::ParseMode;

/// Public myteam endpoint.
pub const DEFAULT_API_URL: &str = "https://myteam.mail.ru";

/// How to reach the bot API.
#[derive(Clone)]
pub struct HttpBotConfig {
    /// Server root; `/bot/v1/` is appended.
    pub api_url: String,
    /// Bot token, sent as the `token` query parameter.
    pub token: String,
    /// Optional proxy for all requests.
    pub proxy: Option<String>,
    /// Timeout of ordinary calls.
    pub timeout: Duration,
    /// Added to the long-poll time to form the `events/get` timeout.
    pub poll_grace: Duration,
    /// Parse mode used when a call does not choose one.
    pub parse_mode: ParseMode,
}

impl HttpBotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            proxy: None,
            timeout: Duration::from_secs(30),
            poll_grace: Duration::from_secs(5),
            parse_mode: ParseMode::Html,
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_grace(mut self, grace: Duration) -> Self {
        self.poll_grace = grace;
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }
}

// The token is a credential; keep it out of debug output.
impl fmt::Debug for HttpBotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBotConfig")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("poll_grace", &self.poll_grace)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}
