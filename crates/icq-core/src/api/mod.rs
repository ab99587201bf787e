//! Typed vendor API surface.
//!
//! [`BotApi`] is implemented for every [`Bot`], including `dyn Bot`, so a
//! [`BoxedBot`](crate::BoxedBot) can call any method directly:
//!
//! ```rust,ignore
//! use icq_core::{BotApi, SendOptions};
//!
//! let sent = bot.send_text("chat@chat.agent", "<b>hi</b>", SendOptions::new()).await?;
//! if sent.ok {
//!     bot.pin_message("chat@chat.agent", sent.msg_id.as_deref().unwrap_or_default()).await?;
//! }
//! ```
//!
//! Each method is a parameter-to-query mapping; the server decides everything
//! else.

pub mod options;
pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use options::{ChatAction, DefaultRole, NewChat, PendingTarget, SendOptions};
pub use types::{
    Ack, BotInfo, ChatAdmin, ChatAdmins, ChatInfo, ChatMember, ChatMembers, CreatedChat,
    FileInfo, Photo, SentMessage, UserList,
};

use crate::bot::{Bot, FileUpload};
use crate::error::ApiResult;
use crate::query::Query;
use options::member_list;

fn parse<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(body)?)
}

/// Typed wrappers over [`Bot::call`] and [`Bot::upload`].
#[async_trait]
pub trait BotApi: Bot {
    /// `self/get`: validates the token and describes the bot.
    async fn get_self(&self) -> ApiResult<BotInfo> {
        parse(self.call("self/get", Query::new()).await?)
    }

    /// `messages/sendText`.
    async fn send_text(&self, chat_id: &str, text: &str, opts: SendOptions) -> ApiResult<SentMessage> {
        let query = Query::new().param("chatId", chat_id).param("text", text);
        let query = opts.apply_references(query);
        let query = opts.apply_keyboard(query)?;
        let query = opts.apply_text_style(query, self.parse_mode())?;
        parse(self.call("messages/sendText", query).await?)
    }

    /// `messages/sendFile` with a previously uploaded file.
    async fn send_file_id(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: Option<&str>,
        opts: SendOptions,
    ) -> ApiResult<SentMessage> {
        let query = Query::new()
            .param("chatId", chat_id)
            .param("fileId", file_id)
            .opt("caption", caption);
        let query = opts.apply_references(query);
        let query = opts.apply_keyboard(query)?;
        let query = opts.apply_text_style(query, self.parse_mode())?;
        parse(self.call("messages/sendFile", query).await?)
    }

    /// `messages/sendFile` uploading a new file.
    async fn send_file(
        &self,
        chat_id: &str,
        file: FileUpload,
        caption: Option<&str>,
        opts: SendOptions,
    ) -> ApiResult<SentMessage> {
        let query = Query::new().param("chatId", chat_id).opt("caption", caption);
        let query = opts.apply_references(query);
        let query = opts.apply_keyboard(query)?;
        let query = opts.apply_text_style(query, self.parse_mode())?;
        parse(self.upload("messages/sendFile", query, file).await?)
    }

    /// `messages/sendVoice` with a previously uploaded voice message.
    ///
    /// Voice messages carry no text, so format and parse mode are ignored.
    async fn send_voice_id(&self, chat_id: &str, file_id: &str, opts: SendOptions) -> ApiResult<SentMessage> {
        let query = Query::new().param("chatId", chat_id).param("fileId", file_id);
        let query = opts.apply_references(query);
        let query = opts.apply_keyboard(query)?;
        parse(self.call("messages/sendVoice", query).await?)
    }

    /// `messages/sendVoice` uploading a new voice message.
    async fn send_voice(&self, chat_id: &str, file: FileUpload, opts: SendOptions) -> ApiResult<SentMessage> {
        let query = Query::new().param("chatId", chat_id);
        let query = opts.apply_references(query);
        let query = opts.apply_keyboard(query)?;
        parse(self.upload("messages/sendVoice", query, file).await?)
    }

    /// `messages/editText`. Reply and forward options are not applicable.
    async fn edit_text(&self, chat_id: &str, msg_id: &str, text: &str, opts: SendOptions) -> ApiResult<Ack> {
        let query = Query::new()
            .param("chatId", chat_id)
            .param("msgId", msg_id)
            .param("text", text);
        let query = opts.apply_keyboard(query)?;
        let query = opts.apply_text_style(query, self.parse_mode())?;
        parse(self.call("messages/editText", query).await?)
    }

    /// `messages/deleteMessages`.
    async fn delete_messages(&self, chat_id: &str, msg_ids: &[String]) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).list("msgId", msg_ids);
        parse(self.call("messages/deleteMessages", query).await?)
    }

    /// `messages/answerCallbackQuery`.
    async fn answer_callback_query(
        &self,
        query_id: &str,
        text: Option<&str>,
        show_alert: bool,
        url: Option<&str>,
    ) -> ApiResult<Ack> {
        let query = Query::new()
            .param("queryId", query_id)
            .opt("text", text)
            .flag("showAlert", show_alert)
            .opt("url", url);
        parse(self.call("messages/answerCallbackQuery", query).await?)
    }

    /// `chats/createChat` (on-premise builds only).
    async fn create_chat(&self, chat: &NewChat) -> ApiResult<CreatedChat> {
        parse(self.call("chats/createChat", chat.to_query()?).await?)
    }

    /// `chats/members/add` (on-premise builds only).
    async fn add_members(&self, chat_id: &str, members: &[String]) -> ApiResult<Ack> {
        let query = Query::new()
            .param("chatId", chat_id)
            .json("members", &member_list(members))?;
        parse(self.call("chats/members/add", query).await?)
    }

    /// `chats/members/delete`.
    async fn delete_members(&self, chat_id: &str, members: &[String]) -> ApiResult<Ack> {
        let query = Query::new()
            .param("chatId", chat_id)
            .json("members", &member_list(members))?;
        parse(self.call("chats/members/delete", query).await?)
    }

    /// `chats/sendActions`. An empty slice clears the current actions.
    async fn send_actions(&self, chat_id: &str, actions: &[ChatAction]) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id);
        let query = if actions.is_empty() {
            query.param("actions", "")
        } else {
            query.list("actions", actions)
        };
        parse(self.call("chats/sendActions", query).await?)
    }

    /// `chats/getInfo`.
    async fn get_chat_info(&self, chat_id: &str) -> ApiResult<ChatInfo> {
        parse(self.call("chats/getInfo", Query::new().param("chatId", chat_id)).await?)
    }

    /// `chats/getAdmins`.
    async fn get_chat_admins(&self, chat_id: &str) -> ApiResult<ChatAdmins> {
        parse(self.call("chats/getAdmins", Query::new().param("chatId", chat_id)).await?)
    }

    /// `chats/getMembers`, one page at a time.
    async fn get_chat_members(&self, chat_id: &str, cursor: Option<&str>) -> ApiResult<ChatMembers> {
        let query = Query::new().param("chatId", chat_id).opt("cursor", cursor);
        parse(self.call("chats/getMembers", query).await?)
    }

    /// `chats/getBlockedUsers`.
    async fn get_blocked_users(&self, chat_id: &str) -> ApiResult<UserList> {
        parse(self.call("chats/getBlockedUsers", Query::new().param("chatId", chat_id)).await?)
    }

    /// `chats/getPendingUsers`.
    async fn get_pending_users(&self, chat_id: &str) -> ApiResult<UserList> {
        parse(self.call("chats/getPendingUsers", Query::new().param("chatId", chat_id)).await?)
    }

    /// `chats/blockUser`.
    async fn block_user(&self, chat_id: &str, user_id: &str, del_last_messages: bool) -> ApiResult<Ack> {
        let query = Query::new()
            .param("chatId", chat_id)
            .param("userId", user_id)
            .flag("delLastMessages", del_last_messages);
        parse(self.call("chats/blockUser", query).await?)
    }

    /// `chats/unblockUser`.
    async fn unblock_user(&self, chat_id: &str, user_id: &str) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).param("userId", user_id);
        parse(self.call("chats/unblockUser", query).await?)
    }

    /// `chats/resolvePending`.
    async fn resolve_pending(&self, chat_id: &str, approve: bool, target: PendingTarget) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).flag("approve", approve);
        let query = match &target {
            PendingTarget::Everyone => query.flag("everyone", true),
            PendingTarget::User(user_id) => query.param("userId", user_id),
        };
        parse(self.call("chats/resolvePending", query).await?)
    }

    /// `chats/setTitle`.
    async fn set_chat_title(&self, chat_id: &str, title: &str) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).param("title", title);
        parse(self.call("chats/setTitle", query).await?)
    }

    /// `chats/setAbout`.
    async fn set_chat_about(&self, chat_id: &str, about: &str) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).param("about", about);
        parse(self.call("chats/setAbout", query).await?)
    }

    /// `chats/setRules`.
    async fn set_chat_rules(&self, chat_id: &str, rules: &str) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).param("rules", rules);
        parse(self.call("chats/setRules", query).await?)
    }

    /// `chats/pinMessage`.
    async fn pin_message(&self, chat_id: &str, msg_id: &str) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).param("msgId", msg_id);
        parse(self.call("chats/pinMessage", query).await?)
    }

    /// `chats/unpinMessage`.
    async fn unpin_message(&self, chat_id: &str, msg_id: &str) -> ApiResult<Ack> {
        let query = Query::new().param("chatId", chat_id).param("msgId", msg_id);
        parse(self.call("chats/unpinMessage", query).await?)
    }

    /// `files/getInfo`.
    async fn get_file_info(&self, file_id: &str) -> ApiResult<FileInfo> {
        parse(self.call("files/getInfo", Query::new().param("fileId", file_id)).await?)
    }
}

impl<B: Bot + ?Sized> BotApi for B {}
