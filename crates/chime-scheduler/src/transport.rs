//! Delivery seam between the scheduler and the messaging channel.

use async_trait::async_trait;
use thiserror::Error;

/// A failed send. The engine treats every failure identically: log, skip
/// the occurrence, keep the schedule moving.
#[derive(Debug, Error)]
#[error("delivery to {destination} failed: {reason}")]
pub struct DeliveryError {
    pub destination: String,
    pub reason: String,
}

/// "Send text T to destination D" — implemented by the Telegram adapter in
/// production and by a recording mock in tests.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError>;
}
