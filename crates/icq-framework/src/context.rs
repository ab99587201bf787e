//! Per-event context handed to middleware and handlers.
//!
//! One [`IcqContext`] is created per decoded event and shared (behind an
//! `Arc`) by every middleware check and handler invocation for that event. It
//! carries the event, its id in the stream, and the bot handle, and offers
//! convenience operations bound to the event's originating chat:
//!
//! ```rust,ignore
//! async fn greet(ctx: Arc<IcqContext>) -> ApiResult<()> {
//!     ctx.reply("hello").await?;
//!     ctx.pin().await?;
//!     Ok(())
//! }
//! ```
//!
//! Operations that do not make sense for the event at hand (pinning a
//! `leftChatMembers` event, answering a callback on a plain message) fail with
//! [`ApiError::NotApplicable`] without touching the network.

use std::path::Path;
use std::sync::Arc;

use icq_core::{
    Ack, ApiError, ApiResult, BotApi, BoxedBot, ChatRef, Event, EventKind, FileUpload,
    SendOptions, SentMessage, UserRef,
};

/// The context of one dispatched event.
pub struct IcqContext {
    event_id: i64,
    event: Arc<Event>,
    bot: BoxedBot,
}

impl IcqContext {
    pub fn new(event_id: i64, event: Event, bot: BoxedBot) -> Self {
        Self {
            event_id,
            event: Arc::new(event),
            bot,
        }
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    /// Position of the event in the bot's event stream.
    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Returns a clone of the event `Arc`.
    pub fn event_arc(&self) -> Arc<Event> {
        Arc::clone(&self.event)
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns a clone of the bot `Arc`.
    pub fn bot_arc(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }

    /// The chat the event originated in.
    pub fn chat(&self) -> &ChatRef {
        self.event.origin_chat()
    }

    pub fn chat_id(&self) -> &str {
        &self.chat().chat_id
    }

    pub fn sender(&self) -> Option<&UserRef> {
        self.event.sender()
    }

    pub fn text(&self) -> Option<&str> {
        self.event.text()
    }

    /// The message the event is about; for callbacks, the keyboard message.
    pub fn msg_id(&self) -> Option<&str> {
        match self.event.as_ref() {
            Event::CallbackQuery(q) => Some(&q.message.msg_id),
            event => event.msg_id(),
        }
    }

    fn not_applicable(&self, operation: &'static str) -> ApiError {
        ApiError::NotApplicable {
            operation,
            kind: self.kind(),
        }
    }

    fn require_msg_id(&self, operation: &'static str) -> ApiResult<&str> {
        self.msg_id().ok_or_else(|| self.not_applicable(operation))
    }

    fn require_text(&self, operation: &'static str) -> ApiResult<&str> {
        self.text().ok_or_else(|| self.not_applicable(operation))
    }

    fn require_sender(&self, operation: &'static str) -> ApiResult<&str> {
        self.sender()
            .map(|u| u.user_id.as_str())
            .ok_or_else(|| self.not_applicable(operation))
    }

    // ─── Sending ──────────────────────────────────────────────────────────────

    /// Sends `text` to the originating chat.
    pub async fn answer(&self, text: &str) -> ApiResult<SentMessage> {
        self.answer_with(text, SendOptions::new()).await
    }

    /// Sends `text` to the originating chat with extra options.
    pub async fn answer_with(&self, text: &str, opts: SendOptions) -> ApiResult<SentMessage> {
        self.bot.send_text(self.chat_id(), text, opts).await
    }

    /// Sends `text` quoting the event's message.
    pub async fn reply(&self, text: &str) -> ApiResult<SentMessage> {
        let msg_id = self.require_msg_id("reply")?;
        self.answer_with(text, SendOptions::new().reply_to(msg_id))
            .await
    }

    /// Forwards the event's message to `chat_id` with `text` as a comment.
    ///
    /// Keyboard and formatting options apply to the comment; any reply or
    /// forward references already in `opts` are kept alongside this message.
    pub async fn forward(&self, chat_id: &str, text: &str, opts: SendOptions) -> ApiResult<SentMessage> {
        let msg_id = self.require_msg_id("forward")?;
        let opts = opts.forward(self.chat_id(), msg_id);
        self.bot.send_text(chat_id, text, opts).await
    }

    pub async fn answer_file_id(&self, file_id: &str, caption: Option<&str>) -> ApiResult<SentMessage> {
        self.bot
            .send_file_id(self.chat_id(), file_id, caption, SendOptions::new())
            .await
    }

    /// Uploads a local file to the originating chat.
    pub async fn answer_file(&self, path: impl AsRef<Path>, caption: Option<&str>) -> ApiResult<SentMessage> {
        let file = FileUpload::from_path(path).await?;
        self.bot
            .send_file(self.chat_id(), file, caption, SendOptions::new())
            .await
    }

    pub async fn answer_voice_id(&self, file_id: &str) -> ApiResult<SentMessage> {
        self.bot
            .send_voice_id(self.chat_id(), file_id, SendOptions::new())
            .await
    }

    /// Uploads a local voice recording to the originating chat.
    pub async fn answer_voice(&self, path: impl AsRef<Path>) -> ApiResult<SentMessage> {
        let file = FileUpload::from_path(path).await?;
        self.bot
            .send_voice(self.chat_id(), file, SendOptions::new())
            .await
    }

    /// Answers the callback query this event carries.
    pub async fn answer_callback(&self, text: Option<&str>, show_alert: bool, url: Option<&str>) -> ApiResult<Ack> {
        let query = self
            .event
            .as_callback()
            .ok_or_else(|| self.not_applicable("answer_callback"))?;
        self.bot
            .answer_callback_query(&query.query_id, text, show_alert, url)
            .await
    }

    // ─── Message management ──────────────────────────────────────────────────

    pub async fn delete_message(&self) -> ApiResult<Ack> {
        let msg_id = self.require_msg_id("delete_message")?;
        self.bot
            .delete_messages(self.chat_id(), &[msg_id.to_string()])
            .await
    }

    pub async fn pin(&self) -> ApiResult<Ack> {
        let msg_id = self.require_msg_id("pin")?;
        self.bot.pin_message(self.chat_id(), msg_id).await
    }

    pub async fn unpin(&self) -> ApiResult<Ack> {
        let msg_id = self.require_msg_id("unpin")?;
        self.bot.unpin_message(self.chat_id(), msg_id).await
    }

    // ─── Chat management ──────────────────────────────────────────────────────

    /// Uses the message text as the new chat title.
    pub async fn set_chat_title_from_text(&self) -> ApiResult<Ack> {
        let title = self.require_text("set_chat_title_from_text")?;
        self.bot.set_chat_title(self.chat_id(), title).await
    }

    pub async fn set_chat_about_from_text(&self) -> ApiResult<Ack> {
        let about = self.require_text("set_chat_about_from_text")?;
        self.bot.set_chat_about(self.chat_id(), about).await
    }

    pub async fn set_chat_rules_from_text(&self) -> ApiResult<Ack> {
        let rules = self.require_text("set_chat_rules_from_text")?;
        self.bot.set_chat_rules(self.chat_id(), rules).await
    }

    /// Blocks the user who caused the event in the originating chat.
    pub async fn block_sender(&self, del_last_messages: bool) -> ApiResult<Ack> {
        let user_id = self.require_sender("block_sender")?;
        self.bot
            .block_user(self.chat_id(), user_id, del_last_messages)
            .await
    }

    /// Removes the user who caused the event from the originating chat.
    pub async fn remove_sender(&self) -> ApiResult<Ack> {
        let user_id = self.require_sender("remove_sender")?;
        self.bot
            .delete_members(self.chat_id(), &[user_id.to_string()])
            .await
    }
}

impl std::fmt::Debug for IcqContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcqContext")
            .field("event_id", &self.event_id)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use icq_core::{Bot, ParseMode, Query};
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;

    /// Records calls and answers every one with `{"ok": true, "msgId": "100"}`.
    #[derive(Default)]
    pub(crate) struct RecordingBot {
        pub(crate) calls: Mutex<Vec<(String, Query)>>,
    }

    impl RecordingBot {
        pub(crate) fn methods(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl Bot for RecordingBot {
        async fn call(&self, method: &str, query: Query) -> ApiResult<Value> {
            self.calls.lock().push((method.to_string(), query));
            Ok(json!({ "ok": true, "msgId": "100" }))
        }

        async fn upload(&self, method: &str, query: Query, _file: FileUpload) -> ApiResult<Value> {
            self.call(method, query).await
        }
    }

    pub(crate) fn message(kind: EventKind, text: &str) -> Event {
        Event::from_payload(
            kind,
            &json!({
                "chat": { "chatId": "chat@chat.agent", "type": "group" },
                "from": { "userId": "user@corp", "firstName": "Ann" },
                "msgId": "57",
                "timestamp": 1_546_290_000,
                "text": text
            }),
        )
        .unwrap()
    }

    pub(crate) fn callback(data: &str) -> Event {
        Event::from_payload(
            EventKind::CallbackQuery,
            &json!({
                "queryId": "SVR:123",
                "from": { "userId": "user@corp", "firstName": "Ann" },
                "callbackData": data,
                "message": {
                    "chat": { "chatId": "chat@chat.agent", "type": "group" },
                    "from": { "userId": "bot", "firstName": "Bot" },
                    "msgId": "58",
                    "timestamp": 1_546_290_000,
                    "text": "pick one"
                }
            }),
        )
        .unwrap()
    }

    pub(crate) fn left_members() -> Event {
        Event::from_payload(
            EventKind::LeftChatMembers,
            &json!({
                "chat": { "chatId": "chat@chat.agent", "type": "group" },
                "leftMembers": [{ "userId": "gone@corp", "firstName": "Bo" }]
            }),
        )
        .unwrap()
    }

    fn context(event: Event) -> (Arc<RecordingBot>, IcqContext) {
        let bot = Arc::new(RecordingBot::default());
        let ctx = IcqContext::new(1, event, bot.clone());
        (bot, ctx)
    }

    #[tokio::test]
    async fn test_reply_quotes_message() {
        let (bot, ctx) = context(message(EventKind::NewMessage, "hi"));
        ctx.reply("hello").await.unwrap();

        let calls = bot.calls.lock();
        let (method, query) = &calls[0];
        assert_eq!(method, "messages/sendText");
        assert_eq!(query.get("chatId"), Some("chat@chat.agent"));
        assert_eq!(query.get("replyMsgId"), Some("57"));
    }

    #[tokio::test]
    async fn test_forward_targets_other_chat() {
        let (bot, ctx) = context(message(EventKind::NewMessage, "hi"));
        ctx.forward("other@chat.agent", "look at this", SendOptions::new())
            .await
            .unwrap();

        let calls = bot.calls.lock();
        let (method, query) = &calls[0];
        assert_eq!(method, "messages/sendText");
        assert_eq!(query.get("chatId"), Some("other@chat.agent"));
        assert_eq!(query.get("text"), Some("look at this"));
        assert_eq!(query.get("forwardChatId"), Some("chat@chat.agent"));
        assert_eq!(query.get("forwardMsgId"), Some("57"));
    }

    #[tokio::test]
    async fn test_forward_passes_comment_options() {
        let (bot, ctx) = context(message(EventKind::NewMessage, "hi"));
        let opts = SendOptions::new().parse_mode(ParseMode::MarkdownV2);
        ctx.forward("other@chat.agent", "*fwd*", opts).await.unwrap();

        let calls = bot.calls.lock();
        assert_eq!(calls[0].1.get("parseMode"), Some("MarkdownV2"));
        assert_eq!(calls[0].1.get("text"), Some("*fwd*"));
    }

    #[tokio::test]
    async fn test_forward_needs_a_message() {
        let (bot, ctx) = context(left_members());
        let err = ctx
            .forward("other@chat.agent", "", SendOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotApplicable { .. }));
        assert!(bot.methods().is_empty());
    }

    #[tokio::test]
    async fn test_callback_operations_use_embedded_message() {
        let (bot, ctx) = context(callback("yes"));
        assert_eq!(ctx.chat_id(), "chat@chat.agent");

        ctx.answer_callback(Some("ok"), true, None).await.unwrap();
        ctx.delete_message().await.unwrap();

        let calls = bot.calls.lock();
        assert_eq!(calls[0].0, "messages/answerCallbackQuery");
        assert_eq!(calls[0].1.get("queryId"), Some("SVR:123"));
        assert_eq!(calls[0].1.get("showAlert"), Some("true"));
        assert_eq!(calls[1].1.get("msgId"), Some("58"));
    }

    #[tokio::test]
    async fn test_inapplicable_operations_fail_without_calling() {
        let (bot, ctx) = context(left_members());

        let err = ctx.pin().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::NotApplicable { operation: "pin", kind: EventKind::LeftChatMembers }
        ));
        assert!(ctx.answer_callback(None, false, None).await.is_err());
        assert!(ctx.set_chat_title_from_text().await.is_err());
        assert!(ctx.block_sender(false).await.is_err());
        assert!(bot.methods().is_empty());
    }

    #[tokio::test]
    async fn test_chat_management_from_text() {
        let (bot, ctx) = context(message(EventKind::NewMessage, "New title"));
        ctx.set_chat_title_from_text().await.unwrap();
        ctx.remove_sender().await.unwrap();

        let calls = bot.calls.lock();
        assert_eq!(calls[0].1.get("title"), Some("New title"));
        assert_eq!(calls[1].0, "chats/members/delete");
        assert_eq!(calls[1].1.get("members"), Some(r#"[{"sn":"user@corp"}]"#));
    }
}
