//! Typed responses of the vendor methods.
//!
//! All fields the server may omit are optional so that a partial answer still
//! decodes; callers check `ok` for delivery confirmation.

use serde::{Deserialize, Serialize};

use crate::model::UserRef;

/// Generic `{ "ok": bool, "description": "..." }` answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Answer to the send methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    #[serde(default)]
    pub ok: bool,
    /// Id of the new message, present when `ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A profile photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
}

/// Answer to `self/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotInfo {
    pub user_id: String,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub photo: Vec<Photo>,
    #[serde(default)]
    pub ok: bool,
}

/// Answer to `chats/getInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInfo {
    #[serde(rename = "type", default)]
    pub chat_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub rules: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub join_moderation: Option<bool>,
    /// Private chats describe the peer instead of a group.
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub nick: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAdmin {
    pub user_id: String,
    #[serde(default)]
    pub creator: bool,
}

/// Answer to `chats/getAdmins`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAdmins {
    #[serde(default)]
    pub admins: Vec<ChatAdmin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMember {
    pub user_id: String,
    #[serde(default)]
    pub creator: bool,
    #[serde(default)]
    pub admin: bool,
}

/// One page of `chats/getMembers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMembers {
    #[serde(default)]
    pub members: Vec<ChatMember>,
    /// Pass back to fetch the next page; absent on the last one.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Answer to `chats/getBlockedUsers` and `chats/getPendingUsers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<UserRef>,
}

/// Answer to `chats/createChat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedChat {
    /// Id of the new chat.
    pub sn: String,
}

/// Answer to `files/getInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
