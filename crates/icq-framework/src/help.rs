//! Built-in help command.
//!
//! When enabled, a new message whose text equals the help token exactly gets
//! an answer listing every registered command prefix with its description.

use serde::{Deserialize, Serialize};

use icq_core::Event;

use crate::registry::HandlerRegistry;

/// Whether the help answer replaces normal routing or runs next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HelpMode {
    /// Only the help answer runs.
    #[default]
    ShortCircuit,
    /// The help answer runs and the message is routed as usual.
    Additive,
}

/// Settings of the help command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpConfig {
    pub enabled: bool,
    /// Text that triggers the listing.
    pub token: String,
    pub mode: HelpMode,
    /// First line of the listing.
    pub header: String,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: "/help".to_string(),
            mode: HelpMode::ShortCircuit,
            header: "Available commands:".to_string(),
        }
    }
}

impl HelpConfig {
    /// Enabled help with default token and mode.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: HelpMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether `event` asks for help.
    pub fn is_request(&self, event: &Event) -> bool {
        self.enabled
            && matches!(event, Event::NewMessage(_))
            && event.text() == Some(self.token.as_str())
    }

    /// Renders the command listing, one `prefix - description` per line.
    pub fn render(&self, registry: &HandlerRegistry) -> String {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = self.header.clone();

        for registration in registry.commands() {
            let Some(command) = registration.command() else {
                continue;
            };
            if seen.contains(&command) {
                continue;
            }
            seen.push(command);

            out.push('\n');
            out.push_str(command);
            if let Some(description) = registration.description() {
                out.push_str(" - ");
                out.push_str(description);
            }
        }

        if seen.is_empty() {
            out.push_str("\n(none)");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use icq_core::EventKind;

    use super::*;
    use crate::context::tests::message;
    use crate::registry::{on_command, on_message, on_start};

    async fn noop() {}

    #[test]
    fn test_request_needs_exact_token() {
        let help = HelpConfig::enabled();
        assert!(help.is_request(&message(EventKind::NewMessage, "/help")));
        assert!(!help.is_request(&message(EventKind::NewMessage, "/help me")));
        assert!(!help.is_request(&message(EventKind::EditedMessage, "/help")));
        assert!(!HelpConfig::default().is_request(&message(EventKind::NewMessage, "/help")));
    }

    #[test]
    fn test_render_lists_commands_once() {
        let registry = HandlerRegistry::new()
            .with(on_start().description("Say hello").handler(noop))
            .and_then(|r| r.with(on_command("/weather").handler(noop)))
            .and_then(|r| r.with(on_command("/start").handler(noop)))
            .and_then(|r| r.with(on_message().handler(noop)))
            .unwrap();

        assert_eq!(
            HelpConfig::enabled().render(&registry),
            "Available commands:\n/start - Say hello\n/weather"
        );
    }

    #[test]
    fn test_render_without_commands() {
        let rendered = HelpConfig::enabled().render(&HandlerRegistry::new());
        assert_eq!(rendered, "Available commands:\n(none)");
    }

    #[test]
    fn test_mode_wire_names() {
        let mode: HelpMode = serde_json::from_str(r#""additive""#).unwrap();
        assert_eq!(mode, HelpMode::Additive);
        let mode: HelpMode = serde_json::from_str(r#""short-circuit""#).unwrap();
        assert_eq!(mode, HelpMode::ShortCircuit);
    }
}
