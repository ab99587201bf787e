//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, IcqConfig, LogOutput, LoggingConfig, PollingConfig, RetryConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &IcqConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_polling_config(&config.polling)?;
    validate_logging_config(&config.logging)?;

    if config.help.enabled && config.help.token.is_empty() {
        return Err(ConfigError::missing_field("help.token"));
    }

    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.token.is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }

    if bot.token.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot token cannot contain whitespace"));
    }

    validate_url(&bot.api_url, &["http://", "https://"])?;

    if let Some(proxy) = &bot.proxy {
        validate_url(proxy, &["http://", "https://", "socks5://", "socks5h://"])?;
    }

    if bot.timeout_secs == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if polling.poll_time_secs == 0 {
        return Err(ConfigError::validation("Poll time must be greater than 0"));
    }

    if polling.last_event_id < 0 {
        return Err(ConfigError::validation("Last event id cannot be negative"));
    }

    if polling.handler_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "Handler timeout must be greater than 0 when set",
        ));
    }

    validate_retry_config(&polling.retry)
}

/// Validates retry configuration.
fn validate_retry_config(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.initial_delay_ms == 0 {
        return Err(ConfigError::validation(
            "Initial retry delay must be greater than 0",
        ));
    }

    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(ConfigError::validation(
            "Max retry delay must be greater than or equal to initial delay",
        ));
    }

    if retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::validation(
            "Backoff multiplier must be at least 1.0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module: {module:?}"
        )));
    }

    Ok(())
}

/// Validates a URL against the accepted schemes.
fn validate_url(url: &str, schemes: &[&str]) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::invalid_url(url, "URL cannot be empty"));
    }

    if !schemes.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of {schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn valid() -> IcqConfig {
        let mut config = IcqConfig::default();
        config.bot.token = "001.0123456789.0123456789:123456789".into();
        config
    }

    #[test]
    fn test_valid_config() {
        assert_ok!(validate_config(&valid()));
    }

    #[test]
    fn test_missing_token() {
        let err = validate_config(&IcqConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "bot.token"));
    }

    #[test]
    fn test_bad_url_scheme() {
        let mut config = valid();
        config.bot.api_url = "ftp://myteam.mail.ru".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        config.bot.api_url = "https://myteam.mail.ru".into();
        config.bot.proxy = Some("socks5://127.0.0.1:1080".into());
        assert_ok!(validate_config(&config));
    }

    #[test]
    fn test_zero_poll_time() {
        let mut config = valid();
        config.polling.poll_time_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_retry_bounds() {
        let mut config = valid();
        config.polling.retry.max_delay_ms = 10;
        assert_err!(validate_config(&config));

        let mut config = valid();
        config.polling.retry.backoff_multiplier = 0.5;
        assert_err!(validate_config(&config));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        assert_err!(validate_config(&config));

        config.logging.file_path = Some("bot.log".into());
        assert_ok!(validate_config(&config));
    }
}
