//! Long-polling dispatcher wiring.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use crate::context::BotContext;
use crate::handler;

/// Owns the bot and the dptree dispatcher for the dialog handlers.
pub struct TelegramAdapter {
    bot: Bot,
    ctx: Arc<BotContext>,
}

impl TelegramAdapter {
    pub fn new(bot: Bot, ctx: Arc<BotContext>) -> Self {
        Self { bot, ctx }
    }

    /// Connect to Telegram and drive the long-polling loop.
    ///
    /// Never returns — runs for the lifetime of the process.
    pub async fn run(self) {
        info!("telegram: starting long-polling dispatcher");

        let tree = dptree::entry()
            .branch(Update::filter_message().endpoint(handler::handle_message))
            .branch(Update::filter_callback_query().endpoint(handler::handle_callback));

        Dispatcher::builder(self.bot, tree)
            .dependencies(dptree::deps![self.ctx])
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;
    }
}
