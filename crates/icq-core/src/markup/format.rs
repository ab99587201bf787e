//! Text formatting spans and parse modes.
//!
//! The `format` parameter is a JSON object keyed by style, each style holding
//! a list of spans over the message text:
//!
//! ```text
//! {"bold":[{"offset":0,"length":5}],"link":[{"offset":6,"length":4,"url":"https://example.com"}]}
//! ```
//!
//! The same shape arrives inside message events, so [`Format`] is used for
//! both directions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;

/// Server-side markup language applied to message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    #[serde(rename = "HTML", alias = "html")]
    Html,
    #[serde(rename = "MarkdownV2", alias = "markdownv2", alias = "markdown")]
    MarkdownV2,
}

impl ParseMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::MarkdownV2 => "MarkdownV2",
        }
    }
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formatting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Link,
    Mention,
    InlineCode,
    Pre,
    OrderedList,
    UnorderedList,
    Quote,
    /// A style this client does not know about yet.
    #[serde(other)]
    Unknown,
}

/// A styled range of the message text, in UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpan {
    pub offset: usize,
    pub length: usize,
    /// Target of a `link` span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Code language of a `pre` span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl FormatSpan {
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            url: None,
            lang: None,
        }
    }
}

/// Builder for the `format` parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format {
    spans: BTreeMap<FormatStyle, Vec<FormatSpan>>,
}

impl Format {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a span of the given style.
    pub fn span(mut self, style: FormatStyle, span: FormatSpan) -> Self {
        self.spans.entry(style).or_default().push(span);
        self
    }

    pub fn add(self, style: FormatStyle, offset: usize, length: usize) -> Self {
        self.span(style, FormatSpan::new(offset, length))
    }

    pub fn bold(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::Bold, offset, length)
    }

    pub fn italic(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::Italic, offset, length)
    }

    pub fn underline(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::Underline, offset, length)
    }

    pub fn strikethrough(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::Strikethrough, offset, length)
    }

    pub fn link(self, offset: usize, length: usize, url: impl Into<String>) -> Self {
        let span = FormatSpan {
            url: Some(url.into()),
            ..FormatSpan::new(offset, length)
        };
        self.span(FormatStyle::Link, span)
    }

    pub fn mention(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::Mention, offset, length)
    }

    pub fn inline_code(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::InlineCode, offset, length)
    }

    pub fn pre(self, offset: usize, length: usize, lang: Option<String>) -> Self {
        let span = FormatSpan {
            lang,
            ..FormatSpan::new(offset, length)
        };
        self.span(FormatStyle::Pre, span)
    }

    pub fn ordered_list(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::OrderedList, offset, length)
    }

    pub fn unordered_list(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::UnorderedList, offset, length)
    }

    pub fn quote(self, offset: usize, length: usize) -> Self {
        self.add(FormatStyle::Quote, offset, length)
    }

    /// Spans recorded for a style, empty if none.
    pub fn spans(&self, style: FormatStyle) -> &[FormatSpan] {
        self.spans.get(&style).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn to_json(&self) -> ApiResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Any accepted form of the `format` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    /// Spans built with [`Format`].
    Spans(Format),
    /// An object already in wire shape.
    Json(Value),
    /// A pre-encoded JSON string, passed through untouched.
    Raw(String),
}

impl FormatArg {
    pub fn encode(&self) -> ApiResult<String> {
        match self {
            Self::Spans(format) => format.to_json(),
            Self::Json(value) => Ok(serde_json::to_string(value)?),
            Self::Raw(raw) => Ok(raw.clone()),
        }
    }
}

impl From<Format> for FormatArg {
    fn from(format: Format) -> Self {
        Self::Spans(format)
    }
}

impl From<Value> for FormatArg {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for FormatArg {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for FormatArg {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_format_wire_shape() {
        let format = Format::new()
            .bold(0, 5)
            .bold(10, 2)
            .link(6, 4, "https://example.com")
            .pre(12, 3, Some("rust".into()));

        let value: Value = serde_json::from_str(&format.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "bold": [{ "offset": 0, "length": 5 }, { "offset": 10, "length": 2 }],
                "link": [{ "offset": 6, "length": 4, "url": "https://example.com" }],
                "pre": [{ "offset": 12, "length": 3, "lang": "rust" }]
            })
        );
    }

    #[test]
    fn test_inbound_format_tolerates_unknown_styles() {
        let format: Format = serde_json::from_value(json!({
            "italic": [{ "offset": 1, "length": 2 }],
            "sparkles": [{ "offset": 0, "length": 1 }]
        }))
        .unwrap();
        assert_eq!(format.spans(FormatStyle::Italic).len(), 1);
        assert_eq!(format.spans(FormatStyle::Unknown).len(), 1);
        assert!(format.spans(FormatStyle::Bold).is_empty());
    }

    #[test]
    fn test_parse_mode_names() {
        assert_eq!(ParseMode::default().as_str(), "HTML");
        let mode: ParseMode = serde_json::from_value(json!("markdown")).unwrap();
        assert_eq!(mode, ParseMode::MarkdownV2);
    }

    #[test]
    fn test_format_arg_raw_passthrough() {
        let arg = FormatArg::from(r#"{"bold":[]}"#);
        assert_eq!(arg.encode().unwrap(), r#"{"bold":[]}"#);
    }
}
