//! Shared app context handed to the teloxide handlers via dptree.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono_tz::Tz;

use chime_scheduler::ReminderService;

use crate::dialog::{DialogState, Session};

/// Everything the Telegram handlers need: the lifecycle service plus the
/// per-chat dialog sessions. Sessions are in-memory only; a restart simply
/// drops half-finished dialogs.
pub struct BotContext {
    pub service: ReminderService,
    pub tz: Tz,
    pub date_format: String,
    pub allow_users: Vec<String>,
    sessions: Mutex<HashMap<i64, Session>>,
}

impl BotContext {
    pub fn new(
        service: ReminderService,
        tz: Tz,
        date_format: String,
        allow_users: Vec<String>,
    ) -> Self {
        Self {
            service,
            tz,
            date_format,
            allow_users,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` against the chat's session, creating an idle one if missing.
    pub fn with_session<R>(&self, chat: i64, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.lock().unwrap();
        f(sessions.entry(chat).or_default())
    }

    /// The chat's current dialog position.
    pub fn state(&self, chat: i64) -> DialogState {
        self.with_session(chat, |s| s.state)
    }
}

/// Whether this Telegram user may talk to the bot.
///
/// Deny-by-default: an empty list allows nobody, `"*"` allows everyone.
/// Entries match the username (leading `@` optional) or the numeric user ID.
pub fn is_allowed(allow_users: &[String], username: &str, user_id: &str) -> bool {
    allow_users.iter().any(|entry| {
        let entry = entry.trim_start_matches('@');
        entry == "*" || entry == username || entry == user_id
    })
}
