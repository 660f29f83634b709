//! Reply helpers. Dialog replies are best-effort: a send failure is logged
//! and the conversation state stays where it was.

use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;
use tracing::warn;

pub async fn send_text(bot: &Bot, chat: ChatId, text: &str) {
    if let Err(e) = bot.send_message(chat, text).await {
        warn!(chat_id = chat.0, error = %e, "telegram: failed to send reply");
    }
}

pub async fn send_with_keyboard(
    bot: &Bot,
    chat: ChatId,
    text: &str,
    markup: impl Into<ReplyMarkup>,
) {
    if let Err(e) = bot.send_message(chat, text).reply_markup(markup.into()).await {
        warn!(chat_id = chat.0, error = %e, "telegram: failed to send reply");
    }
}
