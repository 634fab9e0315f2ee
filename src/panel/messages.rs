//! Control messages for the panel task

use tokio::sync::oneshot;

use crate::bus::{BeginCalibrationResponse, BodyId, NodeId, PairingCommand};
use crate::error::BusError;
use crate::view::DisplayRow;

/// Operator-entered text as returned by the external prompt collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInput {
    pub text: String,
    pub confirmed: bool,
}

impl PromptInput {
    /// A confirmed entry, as if the operator pressed OK
    pub fn confirmed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confirmed: true,
        }
    }

    /// A dismissed prompt
    pub fn cancelled() -> Self {
        Self {
            text: String::new(),
            confirmed: false,
        }
    }
}

/// Requests processed on the panel timeline
#[derive(Debug)]
pub enum PanelRequest {
    /// Start antenna calibration for every module on the selected body
    StartCalibration {
        selected_body: Option<BodyId>,
        golden_input: PromptInput,
    },

    /// Build and start broadcasting a pairing command
    StartPairing {
        selected_body: Option<BodyId>,
        name_input: PromptInput,
    },

    /// Stop broadcasting pairing commands
    StopPairing,

    /// Outcome of one calibration-start request (internal)
    CalibrationReply {
        target: NodeId,
        outcome: Result<BeginCalibrationResponse, BusError>,
    },

    /// Current rows in display order
    Snapshot {
        reply_tx: oneshot::Sender<Vec<DisplayRow>>,
    },

    /// Current pairing state
    PairingState {
        reply_tx: oneshot::Sender<PairingSnapshot>,
    },

    /// Current panel metrics
    GetMetrics {
        reply_tx: oneshot::Sender<PanelMetrics>,
    },

    /// Tear the panel down
    Shutdown,
}

/// Point-in-time pairing state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSnapshot {
    pub active: bool,
    pub pending: Option<PairingCommand>,
}

/// Panel counters for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelMetrics {
    pub events_received: u64,
    pub status_reports: u64,
    pub progress_reports: u64,
    pub request_timeouts: u64,
    pub requests_rejected: u64,
    pub calibrations_completed: u64,
}
