//! Inline keyboard builder.
//!
//! The wire shape is an array of rows, each row an array of button objects:
//!
//! ```text
//! [[{"text":"Yes","callbackData":"yes","style":"primary"}],
//!  [{"text":"Docs","url":"https://example.com"}]]
//! ```

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ApiResult;

/// Default number of buttons per row used by [`InlineKeyboardMarkup::add`].
pub const DEFAULT_BUTTONS_IN_ROW: usize = 8;

/// Visual style of a keyboard button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Base,
    Primary,
    Attention,
}

/// A single inline keyboard button.
///
/// A button either opens a URL or sends its callback data back to the bot
/// as a `callbackQuery` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
}

impl KeyboardButton {
    /// A button that produces a callback query carrying `data`.
    pub fn with_callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
            style: None,
        }
    }

    /// A button that opens `url`.
    pub fn with_url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
            style: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Builder for an inline keyboard.
///
/// # Example
///
/// ```rust,ignore
/// let markup = InlineKeyboardMarkup::new()
///     .row([KeyboardButton::with_callback("Next", "page|2")])
///     .row([KeyboardButton::with_url("Docs", "https://example.com")]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
    buttons_in_row: usize,
    rows: Vec<Vec<KeyboardButton>>,
}

impl Default for InlineKeyboardMarkup {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineKeyboardMarkup {
    pub fn new() -> Self {
        Self::with_buttons_in_row(DEFAULT_BUTTONS_IN_ROW)
    }

    /// Creates a builder whose [`add`](Self::add) wraps after `n` buttons.
    pub fn with_buttons_in_row(n: usize) -> Self {
        Self {
            buttons_in_row: n.max(1),
            rows: Vec::new(),
        }
    }

    /// Appends buttons, starting a new row and wrapping every
    /// `buttons_in_row` buttons.
    pub fn add(mut self, buttons: impl IntoIterator<Item = KeyboardButton>) -> Self {
        let mut row = Vec::with_capacity(self.buttons_in_row);
        for button in buttons {
            row.push(button);
            if row.len() == self.buttons_in_row {
                self.rows.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Appends one row as given, ignoring the per-row limit.
    pub fn row(mut self, buttons: impl IntoIterator<Item = KeyboardButton>) -> Self {
        self.rows.push(buttons.into_iter().collect());
        self
    }

    pub fn rows(&self) -> &[Vec<KeyboardButton>] {
        &self.rows
    }

    pub fn buttons_in_row(&self) -> usize {
        self.buttons_in_row
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialises the keyboard to its wire JSON string.
    pub fn to_json(&self) -> ApiResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for InlineKeyboardMarkup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

/// Any accepted form of the `inlineKeyboardMarkup` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyboardArg {
    /// A keyboard built with [`InlineKeyboardMarkup`].
    Markup(InlineKeyboardMarkup),
    /// Rows already in wire shape.
    Json(Value),
    /// A pre-encoded JSON string, passed through untouched.
    Raw(String),
}

impl KeyboardArg {
    /// Encodes the argument into the query parameter value.
    pub fn encode(&self) -> ApiResult<String> {
        match self {
            Self::Markup(markup) => markup.to_json(),
            Self::Json(value) => Ok(serde_json::to_string(value)?),
            Self::Raw(raw) => Ok(raw.clone()),
        }
    }
}

impl From<InlineKeyboardMarkup> for KeyboardArg {
    fn from(markup: InlineKeyboardMarkup) -> Self {
        Self::Markup(markup)
    }
}

impl From<Value> for KeyboardArg {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for KeyboardArg {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for KeyboardArg {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}
