//! Telegram implementation of the scheduler's delivery seam.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::debug;

use chime_scheduler::{DeliveryError, DeliveryTransport};

/// Sends fired reminders to their destination chat.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl DeliveryTransport for TelegramTransport {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError> {
        let recipient = recipient_for(destination).ok_or_else(|| DeliveryError {
            destination: destination.to_string(),
            reason: "not a numeric chat ID or @username".to_string(),
        })?;
        debug!(%destination, "telegram: delivering reminder");
        self.bot
            .send_message(recipient, text)
            .await
            .map_err(|e| DeliveryError {
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Canonical destinations are either a numeric chat ID or `@username`.
fn recipient_for(destination: &str) -> Option<Recipient> {
    if let Ok(id) = destination.parse::<i64>() {
        return Some(Recipient::Id(ChatId(id)));
    }
    if destination.starts_with('@') && destination.len() > 1 {
        return Some(Recipient::ChannelUsername(destination.to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_become_chat_ids() {
        assert!(matches!(
            recipient_for("-1001234567"),
            Some(Recipient::Id(ChatId(-1001234567)))
        ));
        assert!(matches!(
            recipient_for("42"),
            Some(Recipient::Id(ChatId(42)))
        ));
    }

    #[test]
    fn at_references_become_usernames() {
        match recipient_for("@mygroup") {
            Some(Recipient::ChannelUsername(u)) => assert_eq!(u, "@mygroup"),
            other => panic!("unexpected recipient: {other:?}"),
        }
    }

    #[test]
    fn unresolvable_destinations_rejected() {
        assert!(recipient_for("").is_none());
        assert!(recipient_for("@").is_none());
        assert!(recipient_for("not a ref").is_none());
    }
}
