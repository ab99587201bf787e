//! # ICQ Transport
//!
//! HTTP implementation of the [`Bot`](icq_core::Bot) seam.
//!
//! ```text
//! ┌─────────────────────┐
//! │  icq-framework      │  (dispatch, handlers)
//! ├─────────────────────┤
//! │  icq-core           │  (Bot trait, BotApi)
//! ├─────────────────────┤
//! │  icq-transport      │  <- This crate (reqwest)
//! ├─────────────────────┤
//! │  Network (HTTPS)    │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use icq_core::{BotApi, BoxedBot};
//! use icq_transport::{HttpBot, HttpBotConfig};
//!
//! let bot: BoxedBot = Arc::new(HttpBot::new(HttpBotConfig::new("001.0123456789.0123456789:747432131"))?);
//! let me = bot.get_self().await?;
//! ```

pub mod http;

pub use http::{DEFAULT_API_URL, HttpBot, HttpBotConfig};
