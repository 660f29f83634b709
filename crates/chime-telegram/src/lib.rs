//! `chime-telegram` — Telegram front-end for the reminder engine.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling loop.
//! The multi-step add/edit dialogs live in [`dialog`] and [`handler`];
//! [`transport::TelegramTransport`] is the delivery side the scheduler
//! calls when a timer fires. Dialogs only run in private chats; the core
//! crates know nothing about any of this.

pub mod adapter;
pub mod chatref;
pub mod context;
pub mod dialog;
pub mod handler;
pub mod keyboard;
pub mod send;
pub mod transport;

pub use adapter::TelegramAdapter;
pub use context::BotContext;
pub use transport::TelegramTransport;
