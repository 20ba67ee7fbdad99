//! Hand-off of progress messages from worker threads to the async runtime.
//!
//! The bridge is built once at startup. Worker threads hold cheap clones of
//! [`ProgressBridge`] and push messages without blocking; a single pump task
//! on the runtime drains the channel and broadcasts each message in the order
//! it arrived, which keeps every job's own sequence intact.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::HubMessage;
use crate::hub::BroadcastHub;
use crate::observability::Metrics;

/// Sending half, safe to use from any thread.
#[derive(Debug, Clone)]
pub struct ProgressBridge {
    tx: mpsc::UnboundedSender<HubMessage>,
}

/// Receiving half, consumed by the pump task.
#[derive(Debug)]
pub struct BridgeReceiver {
    rx: mpsc::UnboundedReceiver<HubMessage>,
}

impl ProgressBridge {
    pub fn new() -> (Self, BridgeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, BridgeReceiver { rx })
    }

    /// Queue `message` for broadcast and return immediately.
    ///
    /// When the pump is gone (shutdown) the message is logged and dropped;
    /// the caller is never failed because of it.
    pub fn publish(&self, message: HubMessage) -> bool {
        match self.tx.send(message) {
            Ok(()) => true,
            Err(mpsc::error::SendError(message)) => {
                warn!(
                    kind = message.kind(),
                    filename = message.filename().unwrap_or_default(),
                    "Broadcast loop unavailable, dropping progress update"
                );
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl BridgeReceiver {
    /// Take one pending message without waiting.
    pub fn try_recv(&mut self) -> Result<HubMessage, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Spawn the pump on the current runtime.
    pub fn spawn(self, hub: Arc<BroadcastHub>, metrics: Arc<Metrics>) -> JoinHandle<()> {
        tokio::spawn(self.run(hub, metrics))
    }

    /// Broadcast messages one at a time until every sender is dropped.
    pub async fn run(mut self, hub: Arc<BroadcastHub>, metrics: Arc<Metrics>) {
        while let Some(message) = self.rx.recv().await {
            let report = hub.broadcast(&message).await;
            metrics.broadcast_sent(&report);
        }
        debug!("Progress bridge closed, pump exiting");
    }
}
