use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Subscriber channel closed")]
    Closed,

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    #[error("Send failed: {0}")]
    Transport(String),

    #[error("Message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound half of one subscriber's live channel.
///
/// Implementations write a complete text frame per call. A returned error
/// means the channel is no longer usable and the subscriber gets pruned.
#[async_trait]
pub trait SubscriberSink: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError>;
}
