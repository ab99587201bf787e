//! Chat and user references carried inside event payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The conversation an event occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRef {
    /// Chat identifier (`1234@chat.agent` for groups, a user id for private chats).
    pub chat_id: String,
    /// Chat type as reported by the server (`private`, `group`, `channel`).
    #[serde(rename = "type")]
    pub chat_type: String,
    /// Chat title, absent for private chats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChatRef {
    /// Returns `true` for one-to-one chats with the bot.
    pub fn is_private(&self) -> bool {
        self.chat_type == "private"
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{title}({})", self.chat_id),
            None => f.write_str(&self.chat_id),
        }
    }
}

/// A user as seen in an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// User identifier (email or numeric uin).
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
}

impl UserRef {
    /// Best human-readable name: full name, then nick, then id.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.nick.clone().unwrap_or_else(|| self.user_id.clone()),
        }
    }

    /// Mention markup understood by the server inside message text.
    pub fn mention(&self) -> String {
        format!("@[{}]", self.user_id)
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.display_name(), self.user_id)
    }
}
