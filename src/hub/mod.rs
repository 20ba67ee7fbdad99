//! Subscriber registry and fan-out of progress messages.

mod broadcast;
mod sink;

pub use broadcast::{BroadcastHub, BroadcastReport, SubscriptionHandle};
pub use sink::{DeliveryError, SubscriberSink};

/// In-memory sinks for exercising the hub without sockets.
pub mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};

    use async_trait::async_trait;

    use super::{DeliveryError, SubscriberSink};

    /// Records every frame it is sent; can be switched to fail.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        frames: Mutex<Vec<String>>,
        broken: AtomicBool,
    }

    impl RecordingSink {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn failing() -> Arc<Self> {
            let sink = Self::new();
            sink.break_channel();
            sink
        }

        pub fn break_channel(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        pub fn frames(&self) -> Vec<String> {
            self.frames
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Frames decoded as JSON, skipping anything that is not JSON.
        pub fn messages(&self) -> Vec<serde_json::Value> {
            self.frames()
                .iter()
                .filter_map(|frame| serde_json::from_str(frame).ok())
                .collect()
        }
    }

    #[async_trait]
    impl SubscriberSink for RecordingSink {
        async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(DeliveryError::Closed);
            }
            self.frames
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(text.to_string());
            Ok(())
        }
    }
}
