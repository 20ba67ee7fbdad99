use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use super::sink::{DeliveryError, SubscriberSink};
use crate::progress::HubMessage;

/// Longest a single send may take before the subscriber counts as stalled.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Opaque identifier of one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

/// Set of live subscribers plus "send to all".
///
/// The subscriber map is guarded by a plain mutex that is only held to
/// insert, remove or copy out a snapshot; it is never held across a send.
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<SubscriptionHandle, Arc<dyn SubscriberSink>>>,
    next_id: AtomicU64,
    connected_message: String,
    send_timeout: Duration,
}

impl BroadcastHub {
    pub fn new(connected_message: impl Into<String>) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected_message: connected_message.into(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// A subscriber that does not accept a frame within `timeout` is
    /// treated as failed and pruned.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    async fn send_to(&self, sink: &dyn SubscriberSink, text: &str) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.send_timeout, sink.send_text(text))
            .await
            .unwrap_or(Err(DeliveryError::Timeout(self.send_timeout)))
    }

    /// Register a subscriber after sending it the connection confirmation.
    ///
    /// The confirmation goes out before registration so it is always the
    /// first frame the subscriber sees. If it cannot be delivered the
    /// subscriber is never registered.
    pub async fn subscribe(
        &self,
        sink: Arc<dyn SubscriberSink>,
    ) -> Result<SubscriptionHandle, DeliveryError> {
        let greeting = serde_json::to_string(&HubMessage::Connected {
            message: self.connected_message.clone(),
        })?;
        self.send_to(sink.as_ref(), &greeting).await?;

        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let total = {
            let mut subscribers = self.lock();
            subscribers.insert(handle, sink);
            subscribers.len()
        };

        info!(subscriber = %handle, total, "Subscriber connected");
        Ok(handle)
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let (removed, total) = {
            let mut subscribers = self.lock();
            let removed = subscribers.remove(&handle).is_some();
            (removed, subscribers.len())
        };

        if removed {
            info!(subscriber = %handle, total, "Subscriber disconnected");
        } else {
            debug!(subscriber = %handle, "Subscriber already removed");
        }
        removed
    }

    /// Serialize `message` once and send it to every subscriber registered
    /// at the time of the call. Subscribers whose send fails are pruned;
    /// the others still receive the message.
    pub async fn broadcast(&self, message: &HubMessage) -> BroadcastReport {
        let snapshot: Vec<(SubscriptionHandle, Arc<dyn SubscriberSink>)> = {
            let subscribers = self.lock();
            subscribers
                .iter()
                .map(|(handle, sink)| (*handle, Arc::clone(sink)))
                .collect()
        };

        if snapshot.is_empty() {
            return BroadcastReport::default();
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!(kind = message.kind(), error = %e, "Failed to encode broadcast message");
                return BroadcastReport::default();
            }
        };

        let sends = snapshot.iter().map(|(handle, sink)| {
            let text = text.as_str();
            async move { (*handle, self.send_to(sink.as_ref(), text).await) }
        });

        let mut report = BroadcastReport::default();
        for (handle, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(subscriber = %handle, error = %e, "Failed to send to subscriber, pruning");
                    if self.unsubscribe(handle) {
                        report.pruned += 1;
                    }
                }
            }
        }

        debug!(
            kind = message.kind(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast complete"
        );
        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.lock().contains_key(&handle)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionHandle, Arc<dyn SubscriberSink>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
