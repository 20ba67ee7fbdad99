//! Per-job progress state and the thread-to-runtime bridge that carries it
//! to the broadcast hub.

mod bridge;
mod event;
mod tracker;

pub use bridge::{BridgeReceiver, ProgressBridge};
pub use event::{HubMessage, Phase, ProgressSnapshot};
pub use tracker::ProgressTracker;
