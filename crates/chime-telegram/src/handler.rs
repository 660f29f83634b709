//! Message and callback handlers registered in the teloxide Dispatcher.
//!
//! Dialogs run only in private chats; `/id` is the one command answered
//! anywhere, since it is how users discover the ID of a private group they
//! want reminders delivered to.

use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::MessageOrigin;
use tracing::error;

use chime_scheduler::SchedulerError;

use crate::chatref;
use crate::context::{is_allowed, BotContext};
use crate::dialog::{
    format_local, parse_local, rule_from_label, rule_label, DialogState, EditField, EditValue,
};
use crate::keyboard::{
    confirm_keyboard, edit_field_keyboard, edit_inline_keyboard, main_keyboard, rule_keyboard,
    BTN_ADD, BTN_CANCEL, BTN_DELETE, BTN_LIST, BTN_SAVE, CB_EDIT, FIELD_DATE, FIELD_DESTINATION,
    FIELD_RULE, FIELD_TEXT,
};
use crate::send::{send_text, send_with_keyboard};

/// Every incoming message goes through here.
pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    // Ignore other bots.
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let username = from.username.as_deref().unwrap_or("");
    let user_id = from.id.0.to_string();
    if !is_allowed(&ctx.allow_users, username, &user_id) {
        return Ok(());
    }

    let text = msg.text().unwrap_or("").trim();

    // `/id` answers in any chat type.
    if text == "/id" {
        let title = msg.chat.title().unwrap_or("untitled");
        send_text(
            &bot,
            msg.chat.id,
            &format!("Chat ID: {}\nTitle: {}", msg.chat.id.0, title),
        )
        .await;
        return Ok(());
    }

    if !msg.chat.is_private() {
        return Ok(());
    }

    let chat = msg.chat.id;
    let owner = from.id.0 as i64;

    match text {
        "/start" => {
            ctx.with_session(chat.0, |s| s.reset());
            send_with_keyboard(
                &bot,
                chat,
                "Hi! I deliver scheduled reminders to your chats.",
                main_keyboard(),
            )
            .await;
            return Ok(());
        }
        BTN_ADD => {
            ctx.with_session(chat.0, |s| {
                s.reset();
                s.state = DialogState::AddText;
            });
            send_text(&bot, chat, "Enter the reminder text.").await;
            return Ok(());
        }
        BTN_LIST => {
            ctx.with_session(chat.0, |s| s.reset());
            show_list(&bot, chat, owner, &ctx).await;
            return Ok(());
        }
        _ => {}
    }

    match ctx.state(chat.0) {
        DialogState::Idle => {}
        DialogState::AddText => add_text(&bot, chat, text, &ctx).await,
        DialogState::AddDate => add_date(&bot, chat, text, &ctx).await,
        DialogState::AddRule => add_rule(&bot, chat, text, &ctx).await,
        DialogState::AddDestination => add_destination(&bot, chat, owner, &msg, &ctx).await,
        DialogState::EditChooseId => edit_choose_id(&bot, chat, text, &ctx).await,
        DialogState::EditChooseField => edit_choose_field(&bot, chat, text, &ctx).await,
        DialogState::EditEnterValue => edit_enter_value(&bot, chat, &msg, &ctx).await,
        DialogState::EditConfirm => edit_confirm(&bot, chat, text, &ctx).await,
    }
    Ok(())
}

/// The inline "Edit" button under a reminder list.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;
    if q.data.as_deref() != Some(CB_EDIT) {
        return Ok(());
    }
    let Some(chat) = q.message.as_ref().map(|m| m.chat().id) else {
        return Ok(());
    };

    let have_list = ctx.with_session(chat.0, |s| !s.list_ids.is_empty());
    if !have_list {
        send_text(&bot, chat, "Request the reminder list first.").await;
        return Ok(());
    }
    ctx.with_session(chat.0, |s| s.state = DialogState::EditChooseId);
    send_text(&bot, chat, "Send the number of the reminder from the list.").await;
    Ok(())
}

async fn show_list(bot: &Bot, chat: ChatId, owner: i64, ctx: &BotContext) {
    let reminders = match ctx.service.list(owner) {
        Ok(r) => r,
        Err(e) => {
            error!(owner, error = %e, "failed to list reminders");
            send_text(bot, chat, "Something went wrong, try again later.").await;
            return;
        }
    };
    if reminders.is_empty() {
        send_with_keyboard(bot, chat, "No active reminders.", main_keyboard()).await;
        return;
    }

    let mut lines = Vec::with_capacity(reminders.len() + 1);
    lines.push("Active reminders:".to_string());
    let mut ids = Vec::with_capacity(reminders.len());
    for (idx, r) in reminders.iter().enumerate() {
        lines.push(format!(
            "{}) {} | {} | {} | {}",
            idx + 1,
            r.text,
            format_local(r.next_run, &ctx.date_format, ctx.tz),
            rule_label(r.rule),
            r.destination
        ));
        ids.push(r.id);
    }
    ctx.with_session(chat.0, |s| s.list_ids = ids);

    send_with_keyboard(bot, chat, &lines.join("\n"), main_keyboard()).await;
    send_with_keyboard(bot, chat, "Want to edit one?", edit_inline_keyboard()).await;
}

async fn add_text(bot: &Bot, chat: ChatId, text: &str, ctx: &BotContext) {
    if text.is_empty() {
        send_text(bot, chat, "The text cannot be empty. Try again.").await;
        return;
    }
    ctx.with_session(chat.0, |s| {
        s.draft.text = Some(text.to_string());
        s.state = DialogState::AddDate;
    });
    send_text(bot, chat, &date_prompt(ctx)).await;
}

async fn add_date(bot: &Bot, chat: ChatId, text: &str, ctx: &BotContext) {
    let Some(parsed) = parse_local(text, &ctx.date_format, ctx.tz) else {
        send_text(bot, chat, "Couldn't parse that. Try again.").await;
        return;
    };
    ctx.with_session(chat.0, |s| {
        s.draft.date = Some(parsed);
        s.state = DialogState::AddRule;
    });
    send_with_keyboard(bot, chat, "Pick a cadence.", rule_keyboard()).await;
}

async fn add_rule(bot: &Bot, chat: ChatId, text: &str, ctx: &BotContext) {
    let Some(rule) = rule_from_label(text) else {
        send_text(bot, chat, "Pick a cadence from the keyboard.").await;
        return;
    };
    ctx.with_session(chat.0, |s| {
        s.draft.rule = Some(rule);
        s.state = DialogState::AddDestination;
    });
    send_text(bot, chat, DESTINATION_PROMPT).await;
}

async fn add_destination(bot: &Bot, chat: ChatId, owner: i64, msg: &Message, ctx: &BotContext) {
    let Some(destination) = extract_chat_ref(msg) else {
        send_text(bot, chat, DESTINATION_RETRY).await;
        return;
    };
    let draft = ctx.with_session(chat.0, |s| s.draft.clone());
    let (Some(text), Some(date), Some(rule)) = (draft.text, draft.date, draft.rule) else {
        // A half-lost draft (e.g. process restarted mid-dialog) starts over.
        ctx.with_session(chat.0, |s| s.reset());
        send_with_keyboard(bot, chat, "Let's start over.", main_keyboard()).await;
        return;
    };

    match ctx.service.create(owner, &text, date, rule, &destination) {
        Ok(reminder) => {
            ctx.with_session(chat.0, |s| s.reset());
            send_with_keyboard(
                bot,
                chat,
                &format!(
                    "Reminder created: {} ({}).",
                    format_local(reminder.next_run, &ctx.date_format, ctx.tz),
                    rule_label(reminder.rule)
                ),
                main_keyboard(),
            )
            .await;
        }
        Err(SchedulerError::Validation(reason)) => {
            send_text(bot, chat, &format!("That doesn't work: {reason}.")).await;
        }
        Err(e) => {
            error!(owner, error = %e, "failed to create reminder");
            send_text(bot, chat, "Something went wrong, try again later.").await;
        }
    }
}

async fn edit_choose_id(bot: &Bot, chat: ChatId, text: &str, ctx: &BotContext) {
    let ids = ctx.with_session(chat.0, |s| s.list_ids.clone());
    let choice = text.parse::<usize>().ok().filter(|n| (1..=ids.len()).contains(n));
    let Some(idx) = choice else {
        send_text(bot, chat, "No such number. Try again.").await;
        return;
    };
    ctx.with_session(chat.0, |s| {
        s.edit_target = Some(ids[idx - 1]);
        s.state = DialogState::EditChooseField;
    });
    send_with_keyboard(bot, chat, "What do you want to change?", edit_field_keyboard()).await;
}

async fn edit_choose_field(bot: &Bot, chat: ChatId, text: &str, ctx: &BotContext) {
    let field = match text {
        FIELD_TEXT => EditField::Text,
        FIELD_DATE => EditField::Date,
        FIELD_RULE => EditField::Rule,
        FIELD_DESTINATION => EditField::Destination,
        BTN_DELETE => EditField::Delete,
        _ => {
            send_text(bot, chat, "Pick a field from the keyboard.").await;
            return;
        }
    };

    if field == EditField::Delete {
        ctx.with_session(chat.0, |s| {
            s.edit_field = Some(field);
            s.state = DialogState::EditConfirm;
        });
        send_with_keyboard(bot, chat, "Confirm deletion.", confirm_keyboard()).await;
        return;
    }

    ctx.with_session(chat.0, |s| {
        s.edit_field = Some(field);
        s.state = DialogState::EditEnterValue;
    });
    match field {
        EditField::Text => send_text(bot, chat, "Enter the new reminder text.").await,
        EditField::Date => send_text(bot, chat, &date_prompt(ctx)).await,
        EditField::Rule => send_with_keyboard(bot, chat, "Pick a cadence.", rule_keyboard()).await,
        EditField::Destination => send_text(bot, chat, DESTINATION_PROMPT).await,
        EditField::Delete => unreachable!("handled above"),
    }
}

async fn edit_enter_value(bot: &Bot, chat: ChatId, msg: &Message, ctx: &BotContext) {
    let text = msg.text().unwrap_or("").trim();
    let field = ctx.with_session(chat.0, |s| s.edit_field);
    let value = match field {
        Some(EditField::Text) => {
            if text.is_empty() {
                send_text(bot, chat, "The text cannot be empty. Try again.").await;
                return;
            }
            EditValue::Text(text.to_string())
        }
        Some(EditField::Date) => match parse_local(text, &ctx.date_format, ctx.tz) {
            Some(parsed) => EditValue::Date(parsed),
            None => {
                send_text(bot, chat, "Couldn't parse that. Try again.").await;
                return;
            }
        },
        Some(EditField::Rule) => match rule_from_label(text) {
            Some(rule) => EditValue::Rule(rule),
            None => {
                send_text(bot, chat, "Pick a cadence from the keyboard.").await;
                return;
            }
        },
        Some(EditField::Destination) => match extract_chat_ref(msg) {
            Some(dest) => EditValue::Destination(dest),
            None => {
                send_text(bot, chat, DESTINATION_RETRY).await;
                return;
            }
        },
        Some(EditField::Delete) | None => {
            ctx.with_session(chat.0, |s| s.reset());
            send_with_keyboard(bot, chat, "Let's start over.", main_keyboard()).await;
            return;
        }
    };

    ctx.with_session(chat.0, |s| {
        s.pending = Some(value);
        s.state = DialogState::EditConfirm;
    });
    send_with_keyboard(bot, chat, "Save the changes?", confirm_keyboard()).await;
}

async fn edit_confirm(bot: &Bot, chat: ChatId, text: &str, ctx: &BotContext) {
    if text == BTN_CANCEL {
        ctx.with_session(chat.0, |s| s.reset());
        send_with_keyboard(bot, chat, "Changes discarded.", main_keyboard()).await;
        return;
    }

    let (target, field, pending) =
        ctx.with_session(chat.0, |s| (s.edit_target, s.edit_field, s.pending.clone()));
    let Some(id) = target else {
        ctx.with_session(chat.0, |s| s.reset());
        send_with_keyboard(bot, chat, "Let's start over.", main_keyboard()).await;
        return;
    };

    if text == BTN_DELETE {
        if let Err(e) = ctx.service.delete(id) {
            error!(reminder_id = id, error = %e, "failed to delete reminder");
            send_text(bot, chat, "Something went wrong, try again later.").await;
            return;
        }
        ctx.with_session(chat.0, |s| s.reset());
        send_with_keyboard(bot, chat, "Reminder deleted.", main_keyboard()).await;
        return;
    }

    if field == Some(EditField::Delete) {
        send_text(bot, chat, "Press Delete or Cancel.").await;
        return;
    }
    if text != BTN_SAVE {
        send_text(bot, chat, "Press Save or Cancel.").await;
        return;
    }

    let result = match pending {
        Some(EditValue::Text(v)) => ctx.service.edit_text(id, &v),
        Some(EditValue::Date(v)) => ctx.service.edit_date(id, v),
        Some(EditValue::Rule(v)) => ctx.service.edit_rule(id, v),
        Some(EditValue::Destination(v)) => ctx.service.edit_destination(id, &v),
        None => {
            send_text(bot, chat, "Press Delete or Cancel.").await;
            return;
        }
    };

    match result {
        Ok(reminder) => {
            ctx.with_session(chat.0, |s| s.reset());
            send_with_keyboard(
                bot,
                chat,
                &format!(
                    "Saved. Next run: {} ({}).",
                    format_local(reminder.next_run, &ctx.date_format, ctx.tz),
                    rule_label(reminder.rule)
                ),
                main_keyboard(),
            )
            .await;
        }
        Err(SchedulerError::NotFound { .. }) => {
            ctx.with_session(chat.0, |s| s.reset());
            send_with_keyboard(bot, chat, "Reminder not found.", main_keyboard()).await;
        }
        Err(SchedulerError::Validation(reason)) => {
            send_text(bot, chat, &format!("That doesn't work: {reason}.")).await;
        }
        Err(e) => {
            error!(reminder_id = id, error = %e, "failed to edit reminder");
            send_text(bot, chat, "Something went wrong, try again later.").await;
        }
    }
}

const DESTINATION_PROMPT: &str = "Where should it go? Send @username, a t.me link or a chat ID, \
     or forward a message from the target chat. For private groups, add the bot to the group and \
     send /id there.";

const DESTINATION_RETRY: &str = "Couldn't work out the chat. Forward a message from it or send \
     @username, a t.me link or a chat ID.";

fn date_prompt(ctx: &BotContext) -> String {
    format!(
        "Enter the date and time ({}), e.g. {}.",
        ctx.tz.name(),
        format_local(Utc::now(), &ctx.date_format, ctx.tz)
    )
}

/// Destination from a message: a forwarded message names its origin chat
/// directly; otherwise the text is parsed as a chat reference.
fn extract_chat_ref(msg: &Message) -> Option<String> {
    if let Some(origin) = msg.forward_origin() {
        let chat = match origin {
            MessageOrigin::Channel { chat, .. } => Some(chat),
            MessageOrigin::Chat { sender_chat, .. } => Some(sender_chat),
            _ => None,
        };
        if let Some(chat) = chat {
            return Some(match chat.username() {
                Some(username) => format!("@{username}"),
                None => chat.id.0.to_string(),
            });
        }
    }
    msg.text().and_then(chatref::normalize_chat_ref)
}
