use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message pushed to every subscriber, serialized as one JSON object
/// tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    Connected {
        message: String,
    },
    Started {
        filename: String,
        url: String,
    },
    Progress {
        percent: String,
        speed: String,
        eta: String,
        filename: String,
    },
    Completed {
        filename: String,
        message: String,
    },
    Error {
        filename: String,
        message: String,
    },
}

impl HubMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HubMessage::Connected { .. } => "connected",
            HubMessage::Started { .. } => "started",
            HubMessage::Progress { .. } => "progress",
            HubMessage::Completed { .. } => "completed",
            HubMessage::Error { .. } => "error",
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            HubMessage::Connected { .. } => None,
            HubMessage::Started { filename, .. }
            | HubMessage::Progress { filename, .. }
            | HubMessage::Completed { filename, .. }
            | HubMessage::Error { filename, .. } => Some(filename),
        }
    }
}

/// Lifecycle phase of one job's event stream.
///
/// Valid sequences are `Started -> Downloading* -> (Finished | Error)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Started,
    Downloading,
    Finished,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Error)
    }

    /// Whether `next` may follow `current` (`None` = nothing emitted yet).
    pub fn may_follow(current: Option<Phase>, next: Phase) -> bool {
        match current {
            None => next == Phase::Started,
            Some(Phase::Started | Phase::Downloading) => next != Phase::Started,
            Some(Phase::Finished | Phase::Error) => false,
        }
    }
}

/// Latest known progress of one running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub job_id: Uuid,
    pub filename: String,
    pub percent: String,
    pub speed: String,
    pub eta: String,
    pub phase: Option<Phase>,
    pub error_message: Option<String>,
}
