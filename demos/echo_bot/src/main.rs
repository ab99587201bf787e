//! Echo Bot Example
//!
//! Demonstrates the ICQ framework with plain async handler functions.
//!
//! - every message is logged, then echoed back
//! - `/ping`, `/info` and `/start` (with an inline keyboard) commands
//! - keyboard presses are answered through `answerCallbackQuery`
//! - an optional password gate for one chat
//!
//! # Usage
//!
//! ```bash
//! ICQ_BOT__TOKEN=001.xxx cargo run --package echo-bot -- \
//!     --auth-chat 1@chat.agent --password 4231 --allow admin@corp.mail.ru
//! ```

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use icq::prelude::*;
use parking_lot::Mutex;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(about = "Echo bot for the ICQ bot API")]
struct Args {
    /// Configuration file (default: search for icq.toml).
    #[arg(long)]
    config: Option<String>,

    /// Chat guarded by the password gate.
    #[arg(long, requires = "password")]
    auth_chat: Option<String>,

    /// Password users must send before they may talk in the guarded chat.
    #[arg(long)]
    password: Option<String>,

    /// Users allowed in the guarded chat from the start.
    #[arg(long)]
    allow: Vec<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Deletes messages from unknown users in one chat until they send the password.
struct AuthMiddleware {
    chat_id: String,
    password: String,
    allowed: Mutex<HashSet<String>>,
}

impl AuthMiddleware {
    fn new(chat_id: String, password: String, allowed: Vec<String>) -> Self {
        Self {
            chat_id,
            password,
            allowed: Mutex::new(allowed.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        "auth"
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[EventKind::NewMessage]
    }

    async fn check(&self, ctx: Arc<IcqContext>) -> Result<bool, BoxError> {
        debug!(event_id = ctx.event_id(), "Checking event");

        if ctx.chat_id() != self.chat_id {
            return Ok(false);
        }
        let Some(user_id) = ctx.sender().map(|u| u.user_id.clone()) else {
            return Ok(false);
        };

        let listing = {
            let mut allowed = self.allowed.lock();
            if allowed.contains(&user_id) {
                return Ok(false);
            }
            if ctx.text() == Some(self.password.as_str()) {
                allowed.insert(user_id);
                return Ok(false);
            }
            allowed
                .iter()
                .map(|user| format!("@[{user}]"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        ctx.delete_message().await?;

        let bot = ctx.bot();
        bot.send_text(
            &user_id,
            &format!("We are not supposed to talk, allowed users:\n{listing}"),
            SendOptions::new(),
        )
        .await?;
        ctx.answer(&format!("User @[{user_id}] isn't allowed to talk in this chat"))
            .await?;

        Ok(true)
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// Logs every message.
async fn log_message(message: MessageEvent) {
    info!(
        chat = %message.chat.chat_id,
        from = %message.from.user_id,
        "{}",
        message.text.as_deref().unwrap_or("<no text>")
    );
}

/// Echoes plain text back to the chat.
async fn echo(ctx: Arc<IcqContext>) -> Option<String> {
    ctx.text()
        .filter(|text| !text.starts_with('/'))
        .map(str::to_string)
}

async fn ping(ctx: Arc<IcqContext>) -> ApiResult<()> {
    ctx.reply("Pong!").await?;
    Ok(())
}

async fn message_info(message: MessageEvent) -> String {
    format!(
        "Message Info\n\
        • Chat: {} ({})\n\
        • From: {} ({})\n\
        • Message ID: {}",
        message.chat.chat_id,
        message.chat.chat_type,
        message.from.first_name.as_deref().unwrap_or("Unknown"),
        message.from.user_id,
        message.msg_id,
    )
}

/// Greets with an inline keyboard.
async fn start(ctx: Arc<IcqContext>) -> ApiResult<()> {
    let keyboard = InlineKeyboardMarkup::new()
        .row([KeyboardButton::with_callback("Button callbackData", "test|data")
            .style(ButtonStyle::Primary)])
        .row([KeyboardButton::with_url("Button url", "https://mail.ru/")]);

    ctx.answer_with(
        "Hello! Press a button or send /help.",
        SendOptions::new().keyboard(keyboard),
    )
    .await?;
    Ok(())
}

async fn on_button(ctx: Arc<IcqContext>, query: CallbackQueryEvent) -> ApiResult<()> {
    info!(data = %query.callback_data, "Callback");
    let text = format!("{}|{}", query.callback_data, query.from.user_id);
    ctx.answer_callback(Some(&text), false, None).await?;
    Ok(())
}

async fn welcome(members: MembersEvent) -> Option<String> {
    if members.members.is_empty() {
        return None;
    }
    let names: Vec<String> = members
        .members
        .iter()
        .map(|user| format!("@[{}]", user.user_id))
        .collect();
    Some(format!("Welcome, {}!", names.join(", ")))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = IcqRuntime::builder().set("help.enabled", true);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;

    if let (Some(chat_id), Some(password)) = (args.auth_chat, args.password) {
        runtime.add_middleware(AuthMiddleware::new(chat_id, password, args.allow))?;
    }

    runtime.register(on_message().name("log").handler(log_message))?;
    runtime.register(on_message().name("echo").handler(echo))?;
    runtime.register(on_command("/ping").description("Pong!").handler(ping))?;
    runtime.register(on_command("/info").description("Message info").handler(message_info))?;
    runtime.register(on_start().description("Show the keyboard").handler(start))?;
    runtime.register(on_callback_query().handler(on_button))?;
    runtime.register(on_new_chat_members().handler(welcome))?;

    runtime.run().await?;
    Ok(())
}
