//! # ICQ Core
//!
//! Protocol-level building blocks of the ICQ bot framework.
//!
//! This crate knows what the vendor API looks like but not how to reach it:
//!
//! - **Entity model**: event kinds, chat and user references, and the decoded
//!   [`Event`] sum type ([`model`])
//! - **Markup**: inline keyboards and text-format spans ([`markup`])
//! - **Bot seam**: the [`Bot`] trait a transport implements, and the typed
//!   [`BotApi`] methods every bot gets for free ([`bot`], [`api`])
//!
//! ## Data flow
//!
//! ```text
//! ┌────────────┐  EventBatch  ┌──────────┐   Event   ┌────────────┐
//! │ Bot (HTTP) │─────────────▶│ Envelope │──────────▶│ Dispatcher │
//! └────────────┘              │ .decode()│           └────────────┘
//!       ▲                     └──────────┘                 │
//!       └──────────────────── BotApi calls ◀───────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use icq_core::{BotApi, Envelope, Event, SendOptions};
//!
//! let batch = bot.fetch_events(0, 30).await?;
//! for envelope in &batch.events {
//!     if let Ok(Event::NewMessage(msg)) = envelope.decode() {
//!         bot.send_text(&msg.chat.chat_id, "got it", SendOptions::new().reply_to(&msg.msg_id))
//!             .await?;
//!     }
//! }
//! ```

pub mod api;
pub mod bot;
pub mod error;
pub mod markup;
pub mod model;
pub mod query;

pub use api::{
    Ack, BotApi, BotInfo, ChatAction, ChatAdmin, ChatAdmins, ChatInfo, ChatMember, ChatMembers,
    CreatedChat, DefaultRole, FileInfo, NewChat, PendingTarget, Photo, SendOptions, SentMessage,
    UserList,
};
pub use bot::{Bot, BoxedBot, FileUpload};
pub use error::{ApiError, ApiResult, DecodeError, DecodeResult};
pub use markup::{
    ButtonStyle, Format, FormatArg, FormatSpan, FormatStyle, InlineKeyboardMarkup, KeyboardArg,
    KeyboardButton, ParseMode,
};
pub use model::{
    CallbackQueryEvent, ChatInfoChangedEvent, ChatRef, Envelope, Event, EventBatch, EventKind,
    MembersEvent, MessageEvent, MessageRefEvent, UserRef,
};
pub use query::Query;
