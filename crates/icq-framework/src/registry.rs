//! Handler registrations and the routing rule.
//!
//! A [`Registration`] pairs a handler with the [`EventKind`] it listens to
//! and, for new messages, an optional command prefix. An event routes to
//! every registration whose kind equals the event's kind and whose prefix, if
//! any, starts the message text (exact, case-sensitive, no trimming). All
//! matches run; there is no first-match-wins.
//!
//! Registrations are built with the `on_*` functions:
//!
//! ```rust,ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register(on_message().handler(echo))?;
//! registry.register(on_command("/weather").description("Forecast").handler(weather))?;
//! registry.register(on_callback_query().handler(on_button))?;
//! ```

use icq_core::{Event, EventKind};
use tracing::debug;

use crate::error::{RegistrationError, RegistrationResult};
use crate::handler::{BoxedHandler, Handler, into_handler};

// ============================================================================
// Registration
// ============================================================================

/// A handler bound to an event kind and an optional command prefix.
#[derive(Clone)]
pub struct Registration {
    kind: EventKind,
    command: Option<String>,
    description: Option<String>,
    name: Option<String>,
    handler: BoxedHandler,
}

impl Registration {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Name used in logs, defaulting to the command or the kind.
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.command.as_deref())
            .unwrap_or(self.kind.as_str())
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Whether `event` routes to this registration.
    pub fn matches(&self, event: &Event) -> bool {
        if event.kind() != self.kind {
            return false;
        }
        match &self.command {
            None => true,
            Some(prefix) => matches!(event, Event::NewMessage(_))
                && event.text().is_some_and(|text| text.starts_with(prefix.as_str())),
        }
    }

    fn validate(&self) -> RegistrationResult<()> {
        match &self.command {
            Some(command) if command.is_empty() => Err(RegistrationError::EmptyCommand),
            Some(_) if self.kind != EventKind::NewMessage => {
                Err(RegistrationError::CommandRequiresNewMessage { kind: self.kind })
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("command", &self.command)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Registration`]; finished by attaching the handler.
#[derive(Debug, Clone)]
pub struct RegistrationBuilder {
    kind: EventKind,
    command: Option<String>,
    description: Option<String>,
    name: Option<String>,
}

impl RegistrationBuilder {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            command: None,
            description: None,
            name: None,
        }
    }

    /// Only route messages whose text starts with `prefix`.
    pub fn command(mut self, prefix: impl Into<String>) -> Self {
        self.command = Some(prefix.into());
        self
    }

    /// Text shown next to the command in the help listing.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets a name for this registration (useful for debugging).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn handler<F, T>(self, f: F) -> Registration
    where
        F: Handler<T> + Send + Sync + 'static,
        T: 'static,
    {
        self.handler_boxed(into_handler(f))
    }

    /// Attaches a pre-built boxed handler.
    pub fn handler_boxed(self, handler: BoxedHandler) -> Registration {
        Registration {
            kind: self.kind,
            command: self.command,
            description: self.description,
            name: self.name,
            handler,
        }
    }
}

// ============================================================================
// Builder functions
// ============================================================================

/// Any kind, with an optional command prefix.
pub fn on(kind: EventKind, command: Option<&str>) -> RegistrationBuilder {
    let builder = RegistrationBuilder::new(kind);
    match command {
        Some(command) => builder.command(command),
        None => builder,
    }
}

/// Every new message.
pub fn on_message() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::NewMessage)
}

/// New messages starting with `prefix`.
pub fn on_command(prefix: impl Into<String>) -> RegistrationBuilder {
    on_message().command(prefix)
}

/// The conventional `/start` command.
pub fn on_start() -> RegistrationBuilder {
    on_command("/start")
}

pub fn on_edited_message() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::EditedMessage)
}

pub fn on_deleted_message() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::DeletedMessage)
}

pub fn on_pinned_message() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::PinnedMessage)
}

pub fn on_unpinned_message() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::UnpinnedMessage)
}

pub fn on_new_chat_members() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::NewChatMembers)
}

pub fn on_left_chat_members() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::LeftChatMembers)
}

pub fn on_changed_chat_info() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::ChangedChatInfo)
}

pub fn on_callback_query() -> RegistrationBuilder {
    RegistrationBuilder::new(EventKind::CallbackQuery)
}

// ============================================================================
// Registry
// ============================================================================

/// Registrations in the order they were made.
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration after validating it.
    pub fn register(&mut self, registration: Registration) -> RegistrationResult<()> {
        registration.validate()?;
        debug!(
            kind = %registration.kind,
            command = registration.command(),
            name = registration.name(),
            "Handler registered"
        );
        self.registrations.push(registration);
        Ok(())
    }

    /// Adds a registration (builder pattern).
    pub fn with(mut self, registration: Registration) -> RegistrationResult<Self> {
        self.register(registration)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    /// Every registration `event` routes to, in registration order.
    pub fn route<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a Registration> + 'a {
        self.registrations.iter().filter(move |r| r.matches(event))
    }

    /// Command registrations, for the help listing.
    pub fn commands(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter().filter(|r| r.command.is_some())
    }
}
