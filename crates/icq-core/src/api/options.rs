//! Argument builders for the vendor methods.

use serde::Serialize;

use crate::error::ApiResult;
use crate::markup::{FormatArg, KeyboardArg, ParseMode};
use crate::query::Query;

/// Optional arguments of the send and edit methods.
///
/// `reply_msg_id` and the forward pair are mutually exclusive on the server;
/// the builder does not police that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    pub reply_msg_id: Vec<String>,
    pub forward_chat_id: Option<String>,
    pub forward_msg_id: Vec<String>,
    pub keyboard: Option<KeyboardArg>,
    pub format: Option<FormatArg>,
    pub parse_mode: Option<ParseMode>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quotes `msg_id` in the new message.
    pub fn reply_to(mut self, msg_id: impl Into<String>) -> Self {
        self.reply_msg_id.push(msg_id.into());
        self
    }

    /// Forwards `msg_id` from `chat_id` along with the new message.
    pub fn forward(mut self, chat_id: impl Into<String>, msg_id: impl Into<String>) -> Self {
        self.forward_chat_id = Some(chat_id.into());
        self.forward_msg_id.push(msg_id.into());
        self
    }

    pub fn keyboard(mut self, keyboard: impl Into<KeyboardArg>) -> Self {
        self.keyboard = Some(keyboard.into());
        self
    }

    pub fn format(mut self, format: impl Into<FormatArg>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Adds the reply and forward arguments.
    pub(crate) fn apply_references(&self, query: Query) -> Query {
        query
            .list("replyMsgId", &self.reply_msg_id)
            .opt("forwardChatId", self.forward_chat_id.as_deref())
            .list("forwardMsgId", &self.forward_msg_id)
    }

    pub(crate) fn apply_keyboard(&self, query: Query) -> ApiResult<Query> {
        let keyboard = self.keyboard.as_ref().map(KeyboardArg::encode).transpose()?;
        Ok(query.opt("inlineKeyboardMarkup", keyboard))
    }

    /// Adds `format`, or the parse mode when no explicit spans are given.
    pub(crate) fn apply_text_style(&self, query: Query, default_mode: ParseMode) -> ApiResult<Query> {
        match &self.format {
            Some(format) => Ok(query.param("format", format.encode()?)),
            None => Ok(query.param("parseMode", self.parse_mode.unwrap_or(default_mode))),
        }
    }
}

/// Chat activity shown to other members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Looking,
    Typing,
}

impl ChatAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Looking => "looking",
            Self::Typing => "typing",
        }
    }
}

impl std::fmt::Display for ChatAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whose join requests `chats/resolvePending` applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTarget {
    Everyone,
    User(String),
}

/// Default role of members joining a new chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultRole {
    /// Regular member, for groups.
    #[default]
    Member,
    /// Read-only member, for channels.
    Readonly,
}

impl DefaultRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Readonly => "readonly",
        }
    }
}

#[derive(Serialize)]
pub(crate) struct MemberSn<'a> {
    pub(crate) sn: &'a str,
}

/// Encodes user ids as the `[{"sn": "..."}]` member list.
pub(crate) fn member_list(members: &[String]) -> Vec<MemberSn<'_>> {
    members.iter().map(|sn| MemberSn { sn }).collect()
}

/// Arguments of `chats/createChat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub name: String,
    pub about: Option<String>,
    pub rules: Option<String>,
    pub members: Vec<String>,
    pub public: bool,
    pub default_role: DefaultRole,
    pub join_moderation: bool,
}

impl NewChat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            rules: None,
            members: Vec::new(),
            public: true,
            default_role: DefaultRole::Member,
            join_moderation: true,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn member(mut self, user_id: impl Into<String>) -> Self {
        self.members.push(user_id.into());
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn default_role(mut self, role: DefaultRole) -> Self {
        self.default_role = role;
        self
    }

    pub fn join_moderation(mut self, moderated: bool) -> Self {
        self.join_moderation = moderated;
        self
    }

    pub(crate) fn to_query(&self) -> ApiResult<Query> {
        Query::new()
            .param("name", &self.name)
            .opt("about", self.about.as_deref())
            .opt("rules", self.rules.as_deref())
            .flag("public", self.public)
            .param("defaultRole", self.default_role.as_str())
            .flag("joinModeration", self.join_moderation)
            .json("members", &member_list(&self.members))
    }
}
