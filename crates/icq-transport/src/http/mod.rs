//! Long-polling HTTP client for the bot API.

mod client;
mod config;

pub use client::HttpBot;
pub use config::{DEFAULT_API_URL, HttpBotConfig};
