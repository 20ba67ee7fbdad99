use tracing::{debug, trace};
use uuid::Uuid;

use super::bridge::ProgressBridge;
use super::event::{HubMessage, Phase, ProgressSnapshot};
use crate::fetch::HookStatus;
use crate::humanize::UNKNOWN;

const COMPLETED_MESSAGE: &str = "Download completed!";

/// Per-job progress state.
///
/// Owned by the worker running the job. Every accepted update is forwarded
/// through the bridge; updates that would break the phase order
/// (`started`, `downloading`*, then one terminal phase) are discarded.
#[derive(Debug)]
pub struct ProgressTracker {
    snapshot: ProgressSnapshot,
    url: String,
    bridge: ProgressBridge,
}

impl ProgressTracker {
    pub fn new(
        job_id: Uuid,
        filename: impl Into<String>,
        url: impl Into<String>,
        bridge: ProgressBridge,
    ) -> Self {
        Self {
            snapshot: ProgressSnapshot {
                job_id,
                filename: filename.into(),
                percent: "0%".to_string(),
                speed: UNKNOWN.to_string(),
                eta: UNKNOWN.to_string(),
                phase: None,
                error_message: None,
            },
            url: url.into(),
            bridge,
        }
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    pub fn phase(&self) -> Option<Phase> {
        self.snapshot.phase
    }

    pub fn started(&mut self) -> bool {
        self.on_update(Phase::Started, None)
    }

    pub fn downloading(&mut self, percent: &str, speed: &str, eta: &str) -> bool {
        self.on_update(
            Phase::Downloading,
            Some((percent.trim(), speed.trim(), eta.trim())),
        )
    }

    pub fn finished(&mut self) -> bool {
        self.on_update(Phase::Finished, None)
    }

    pub fn failed(&mut self, reason: &str) -> bool {
        if Phase::may_follow(self.snapshot.phase, Phase::Error) {
            self.snapshot.error_message = Some(format!("Download failed: {reason}"));
        }
        self.on_update(Phase::Error, None)
    }

    /// Progress hook handed to the fetcher.
    ///
    /// The fetcher's own `Finished` only means the bytes are on disk; the job
    /// stream is terminated by the worker once `fetch` returns.
    pub fn on_hook(&mut self, status: HookStatus) {
        match status {
            HookStatus::Downloading {
                percent,
                speed,
                eta,
            } => {
                self.downloading(&percent, &speed, &eta);
            }
            HookStatus::Finished => {
                debug!(filename = %self.snapshot.filename, "Fetcher reported data complete");
            }
        }
    }

    fn on_update(&mut self, phase: Phase, stats: Option<(&str, &str, &str)>) -> bool {
        if !Phase::may_follow(self.snapshot.phase, phase) {
            trace!(
                filename = %self.snapshot.filename,
                current = ?self.snapshot.phase,
                rejected = ?phase,
                "Out-of-order progress update ignored"
            );
            return false;
        }

        if let Some((percent, speed, eta)) = stats {
            self.snapshot.percent = percent.to_string();
            self.snapshot.speed = speed.to_string();
            self.snapshot.eta = eta.to_string();
        }
        self.snapshot.phase = Some(phase);

        let message = self.message_for(phase);
        self.bridge.publish(message);
        if phase.is_terminal() {
            debug!(filename = %self.snapshot.filename, ?phase, "Job stream closed");
        }
        true
    }

    fn message_for(&self, phase: Phase) -> HubMessage {
        let filename = self.snapshot.filename.clone();
        match phase {
            Phase::Started => HubMessage::Started {
                filename,
                url: self.url.clone(),
            },
            Phase::Downloading => HubMessage::Progress {
                percent: self.snapshot.percent.clone(),
                speed: self.snapshot.speed.clone(),
                eta: self.snapshot.eta.clone(),
                filename,
            },
            Phase::Finished => HubMessage::Completed {
                filename,
                message: COMPLETED_MESSAGE.to_string(),
            },
            Phase::Error => HubMessage::Error {
                filename,
                message: self
                    .snapshot
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Download failed".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::BridgeReceiver;

    fn tracker() -> (ProgressTracker, BridgeReceiver) {
        let (bridge, receiver) = ProgressBridge::new();
        let tracker = ProgressTracker::new(Uuid::now_v7(), "clip", "https://example.com/v", bridge);
        (tracker, receiver)
    }

    fn drain(receiver: &mut BridgeReceiver) -> Vec<HubMessage> {
        let mut out = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            out.push(message);
        }
        out
    }

    #[test]
    fn emits_full_lifecycle() {
        let (mut tracker, mut receiver) = tracker();

        assert!(tracker.started());
        tracker.on_hook(HookStatus::Downloading {
            percent: " 42.0%".into(),
            speed: "1.00MiB/s ".into(),
            eta: "00:03".into(),
        });
        tracker.on_hook(HookStatus::Finished);
        assert!(tracker.finished());

        let kinds: Vec<&str> = drain(&mut receiver).iter().map(HubMessage::kind).collect();
        assert_eq!(kinds, vec!["started", "progress", "completed"]);
        assert_eq!(tracker.snapshot().percent, "42.0%");
        assert_eq!(tracker.phase(), Some(Phase::Finished));
    }

    #[test]
    fn nothing_after_terminal_phase() {
        let (mut tracker, mut receiver) = tracker();

        tracker.started();
        assert!(tracker.failed("network unreachable"));
        assert!(!tracker.downloading("50%", "N/A", "N/A"));
        assert!(!tracker.finished());
        assert!(!tracker.failed("again"));

        let messages = drain(&mut receiver);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1],
            HubMessage::Error {
                filename: "clip".into(),
                message: "Download failed: network unreachable".into(),
            }
        );
    }

    #[test]
    fn started_is_emitted_once() {
        let (mut tracker, mut receiver) = tracker();

        assert!(tracker.started());
        assert!(!tracker.started());
        assert_eq!(drain(&mut receiver).len(), 1);
    }

    #[test]
    fn progress_before_start_is_ignored() {
        let (mut tracker, mut receiver) = tracker();

        assert!(!tracker.downloading("10%", "N/A", "N/A"));
        assert!(drain(&mut receiver).is_empty());
        assert_eq!(tracker.phase(), None);
    }

    #[test]
    fn duplicate_percent_values_pass_through() {
        let (mut tracker, mut receiver) = tracker();

        tracker.started();
        tracker.downloading("10%", "N/A", "N/A");
        tracker.downloading("10%", "N/A", "N/A");
        assert_eq!(drain(&mut receiver).len(), 3);
    }

    #[test]
    fn rejected_failure_leaves_finished_snapshot_untouched() {
        let (mut tracker, mut receiver) = tracker();

        tracker.started();
        tracker.finished();
        assert!(!tracker.failed("late post-processing error"));

        assert_eq!(tracker.phase(), Some(Phase::Finished));
        assert_eq!(tracker.snapshot().error_message, None);
        assert_eq!(drain(&mut receiver).len(), 2);
    }

    #[test]
    fn second_failure_keeps_first_message() {
        let (mut tracker, _receiver) = tracker();

        tracker.started();
        tracker.failed("disk full");
        tracker.failed("again");

        assert_eq!(
            tracker.snapshot().error_message.as_deref(),
            Some("Download failed: disk full")
        );
    }
}
