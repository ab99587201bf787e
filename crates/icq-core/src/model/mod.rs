//! Entity model: event kinds, chat/user references and decoded events.

pub mod entity;
pub mod event;
pub mod kind;

pub use entity::{ChatRef, UserRef};
pub use event::{
    CallbackQueryEvent, ChatInfoChangedEvent, Envelope, Event, EventBatch, MembersEvent,
    MessageEvent, MessageRefEvent,
};
pub use kind::EventKind;
