use std::sync::Arc;

use teloxide::Bot;
use tracing::info;

use chime_core::ChimeConfig;
use chime_scheduler::{ReminderService, SchedulerEngine};
use chime_store::ReminderStore;
use chime_telegram::{BotContext, TelegramAdapter, TelegramTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chime=info".into()),
        )
        .init();

    // load config: explicit path via CHIME_CONFIG env > ~/.chime/chime.toml
    let config_path = std::env::var("CHIME_CONFIG").ok();
    let config = ChimeConfig::load(config_path.as_deref())?;
    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("telegram.bot_token is not set (chime.toml or CHIME_TELEGRAM_BOT_TOKEN)");
    }
    let tz = config.tz()?;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    let store = ReminderStore::new(conn)?;

    let bot = Bot::new(config.telegram.bot_token.clone());
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let engine = Arc::new(SchedulerEngine::new(store.clone(), transport, tz));
    let armed = engine.rehydrate()?;
    info!(armed, timezone = %tz, "scheduler ready");

    let service = ReminderService::new(store, Arc::clone(&engine), tz);
    let ctx = Arc::new(BotContext::new(
        service,
        tz,
        config.date_format.clone(),
        config.telegram.allow_users.clone(),
    ));

    TelegramAdapter::new(bot, ctx).run().await;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
