//! Typed events and the envelope decoder.
//!
//! Every envelope returned by `events/get` has the shape
//! `{ "eventId": 42, "type": "newMessage", "payload": { ... } }`. The `type`
//! selects an [`EventKind`], and the kind alone decides which fields the
//! payload must carry:
//!
//! | Kind                                    | Payload struct          |
//! |-----------------------------------------|-------------------------|
//! | newMessage, editedMessage, pinnedMessage | [`MessageEvent`]       |
//! | deletedMessage, unpinnedMessage          | [`MessageRefEvent`]    |
//! | newChatMembers, leftChatMembers          | [`MembersEvent`]       |
//! | changedChatInfo                          | [`ChatInfoChangedEvent`] |
//! | callbackQuery                            | [`CallbackQueryEvent`] |
//!
//! Required fields are plain (non-`Option`) struct fields, so a payload that
//! lacks one fails with [`DecodeError::MalformedEventPayload`] instead of
//! being filled with defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::trace;

use super::entity::{ChatRef, UserRef};
use super::kind::EventKind;
use crate::error::{DecodeError, DecodeResult};
use crate::markup::Format;

// =============================================================================
// Envelope
// =============================================================================

/// A raw event as delivered by the server, before decoding.
///
/// Deserializing an envelope never fails: a missing or mistyped `eventId` or
/// `type` is kept as `None` and reported by [`Envelope::decode`], so one bad
/// element cannot reject the whole batch around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Position of the event in the bot's event stream. Numeric strings are
    /// accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    /// Wire name of the event kind.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Kind-specific payload.
    pub payload: Value,
}

impl Envelope {
    /// Builds an envelope from one element of the `events` array.
    pub fn from_value(mut value: Value) -> Self {
        let Some(fields) = value.as_object_mut() else {
            return Self {
                event_id: None,
                kind: None,
                payload: value,
            };
        };
        let event_id = fields.get("eventId").and_then(event_id_of);
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let payload = fields.remove("payload").unwrap_or(Value::Null);
        Self {
            event_id,
            kind,
            payload,
        }
    }

    /// The event id, required before an envelope can be dispatched.
    pub fn id(&self) -> DecodeResult<i64> {
        self.event_id
            .ok_or_else(|| DecodeError::MalformedEnvelope("missing or non-integer eventId".into()))
    }

    /// Decodes this envelope into a typed [`Event`].
    pub fn decode(&self) -> DecodeResult<Event> {
        Event::decode(self)
    }
}

fn event_id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// One long-poll response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Envelopes in server order.
    #[serde(default)]
    pub events: Vec<Envelope>,
}

impl EventBatch {
    /// Id of the last envelope in the batch that carries one, used as the
    /// next cursor.
    pub fn last_event_id(&self) -> Option<i64> {
        self.events.iter().rev().find_map(|e| e.event_id)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload of `newMessage`, `editedMessage` and `pinnedMessage`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub chat: ChatRef,
    pub from: UserRef,
    pub msg_id: String,
    pub timestamp: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub format: Option<Format>,
}

/// Payload of `deletedMessage` and `unpinnedMessage`.
///
/// The server sends neither sender nor text for these.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRefEvent {
    pub chat: ChatRef,
    pub msg_id: String,
    pub timestamp: i64,
}

/// Payload of `newChatMembers` and `leftChatMembers`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MembersEvent {
    pub chat: ChatRef,
    /// Users that joined or left. Absent on the wire means empty.
    #[serde(rename = "newMembers", alias = "leftMembers", default)]
    pub members: Vec<UserRef>,
    /// Who added or removed them, when the server reports it.
    #[serde(rename = "addedBy", alias = "removedBy", default)]
    pub acting_user: Option<UserRef>,
}

/// Payload of `changedChatInfo`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatInfoChangedEvent {
    pub chat: ChatRef,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub rules: Option<String>,
}

/// Payload of `callbackQuery`.
///
/// There is no top-level chat: the chat is reached through the message the
/// pressed button was attached to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackQueryEvent {
    pub query_id: String,
    pub from: UserRef,
    /// The message carrying the keyboard, decoded as a `newMessage` payload.
    pub message: MessageEvent,
    /// Opaque data attached to the pressed button.
    pub callback_data: String,
}

// =============================================================================
// Event
// =============================================================================

/// A decoded event, tagged by its [`EventKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    NewMessage(MessageEvent),
    EditedMessage(MessageEvent),
    DeletedMessage(MessageRefEvent),
    PinnedMessage(MessageEvent),
    UnpinnedMessage(MessageRefEvent),
    NewChatMembers(MembersEvent),
    LeftChatMembers(MembersEvent),
    ChangedChatInfo(ChatInfoChangedEvent),
    CallbackQuery(CallbackQueryEvent),
}

fn payload_as<T: DeserializeOwned>(kind: EventKind, payload: &Value) -> DecodeResult<T> {
    T::deserialize(payload).map_err(|e| {
        trace!(%kind, %payload, "Payload rejected: {e}");
        DecodeError::malformed(kind, e.to_string())
    })
}

impl Event {
    /// Decodes an envelope.
    ///
    /// Fails with [`DecodeError::MalformedEnvelope`] when `type` is absent,
    /// [`DecodeError::UnknownEventKind`] when it is not an exact wire name, or
    /// [`DecodeError::MalformedEventPayload`] when the payload lacks a field
    /// required by the kind. Decoding is pure.
    pub fn decode(envelope: &Envelope) -> DecodeResult<Self> {
        let kind: EventKind = envelope
            .kind
            .as_deref()
            .ok_or_else(|| DecodeError::MalformedEnvelope("missing or non-string type".into()))?
            .parse()?;
        Self::from_payload(kind, &envelope.payload)
    }

    /// Decodes a payload whose kind is already known.
    pub fn from_payload(kind: EventKind, payload: &Value) -> DecodeResult<Self> {
        Ok(match kind {
            EventKind::NewMessage => Self::NewMessage(payload_as(kind, payload)?),
            EventKind::EditedMessage => Self::EditedMessage(payload_as(kind, payload)?),
            EventKind::DeletedMessage => Self::DeletedMessage(payload_as(kind, payload)?),
            EventKind::PinnedMessage => Self::PinnedMessage(payload_as(kind, payload)?),
            EventKind::UnpinnedMessage => Self::UnpinnedMessage(payload_as(kind, payload)?),
            EventKind::NewChatMembers => Self::NewChatMembers(payload_as(kind, payload)?),
            EventKind::LeftChatMembers => Self::LeftChatMembers(payload_as(kind, payload)?),
            EventKind::ChangedChatInfo => Self::ChangedChatInfo(payload_as(kind, payload)?),
            EventKind::CallbackQuery => Self::CallbackQuery(payload_as(kind, payload)?),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewMessage(_) => EventKind::NewMessage,
            Self::EditedMessage(_) => EventKind::EditedMessage,
            Self::DeletedMessage(_) => EventKind::DeletedMessage,
            Self::PinnedMessage(_) => EventKind::PinnedMessage,
            Self::UnpinnedMessage(_) => EventKind::UnpinnedMessage,
            Self::NewChatMembers(_) => EventKind::NewChatMembers,
            Self::LeftChatMembers(_) => EventKind::LeftChatMembers,
            Self::ChangedChatInfo(_) => EventKind::ChangedChatInfo,
            Self::CallbackQuery(_) => EventKind::CallbackQuery,
        }
    }

    /// The top-level chat. `None` only for callback queries.
    pub fn chat(&self) -> Option<&ChatRef> {
        match self {
            Self::NewMessage(m) | Self::EditedMessage(m) | Self::PinnedMessage(m) => Some(&m.chat),
            Self::DeletedMessage(r) | Self::UnpinnedMessage(r) => Some(&r.chat),
            Self::NewChatMembers(m) | Self::LeftChatMembers(m) => Some(&m.chat),
            Self::ChangedChatInfo(c) => Some(&c.chat),
            Self::CallbackQuery(_) => None,
        }
    }

    /// The chat the event originated in, following a callback query into its
    /// embedded message.
    pub fn origin_chat(&self) -> &ChatRef {
        match self {
            Self::CallbackQuery(q) => &q.message.chat,
            Self::NewMessage(m) | Self::EditedMessage(m) | Self::PinnedMessage(m) => &m.chat,
            Self::DeletedMessage(r) | Self::UnpinnedMessage(r) => &r.chat,
            Self::NewChatMembers(m) | Self::LeftChatMembers(m) => &m.chat,
            Self::ChangedChatInfo(c) => &c.chat,
        }
    }

    /// The user who caused the event, for message-like events and callbacks.
    pub fn sender(&self) -> Option<&UserRef> {
        match self {
            Self::NewMessage(m) | Self::EditedMessage(m) | Self::PinnedMessage(m) => Some(&m.from),
            Self::CallbackQuery(q) => Some(&q.from),
            _ => None,
        }
    }

    /// Message text, for message-like events that carry one.
    pub fn text(&self) -> Option<&str> {
        self.as_message().and_then(|m| m.text.as_deref())
    }

    /// Id of the message the event is about.
    pub fn msg_id(&self) -> Option<&str> {
        match self {
            Self::NewMessage(m) | Self::EditedMessage(m) | Self::PinnedMessage(m) => {
                Some(&m.msg_id)
            }
            Self::DeletedMessage(r) | Self::UnpinnedMessage(r) => Some(&r.msg_id),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::NewMessage(m) | Self::EditedMessage(m) | Self::PinnedMessage(m) => {
                Some(m.timestamp)
            }
            Self::DeletedMessage(r) | Self::UnpinnedMessage(r) => Some(r.timestamp),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::NewMessage(m) | Self::EditedMessage(m) | Self::PinnedMessage(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_members(&self) -> Option<&MembersEvent> {
        match self {
            Self::NewChatMembers(m) | Self::LeftChatMembers(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&CallbackQueryEvent> {
        match self {
            Self::CallbackQuery(q) => Some(q),
            _ => None,
        }
    }
}
