//! Keyboard and text-format encoders.

pub mod format;
pub mod keyboard;

pub use format::{Format, FormatArg, FormatSpan, FormatStyle, ParseMode};
pub use keyboard::{ButtonStyle, InlineKeyboardMarkup, KeyboardArg, KeyboardButton};
