//! PanelHandle - client interface for driving a running panel task

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::bus::BodyId;

use super::messages::{PairingSnapshot, PanelMetrics, PanelRequest, PromptInput};

/// Cloneable handle for sending operator actions and queries to the panel
/// task. All operations are async and non-blocking.
#[derive(Clone)]
pub struct PanelHandle {
    tx: mpsc::Sender<PanelRequest>,
}

impl PanelHandle {
    pub(crate) fn new(tx: mpsc::Sender<PanelRequest>) -> Self {
        Self { tx }
    }

    /// Start antenna calibration for every module on `selected_body`,
    /// using the operator-entered golden transceiver node id
    pub async fn start_calibration(&self, selected_body: Option<BodyId>, golden_input: PromptInput) -> Result<()> {
        debug!(?selected_body, "PanelHandle::start_calibration");
        self.tx
            .send(PanelRequest::StartCalibration {
                selected_body,
                golden_input,
            })
            .await
            .map_err(|_| eyre!("Panel channel closed"))
    }

    /// Build a pairing command for `selected_body` and start broadcasting it
    pub async fn start_pairing(&self, selected_body: Option<BodyId>, name_input: PromptInput) -> Result<()> {
        debug!(?selected_body, "PanelHandle::start_pairing");
        self.tx
            .send(PanelRequest::StartPairing {
                selected_body,
                name_input,
            })
            .await
            .map_err(|_| eyre!("Panel channel closed"))
    }

    /// Stop broadcasting pairing commands
    pub async fn stop_pairing(&self) -> Result<()> {
        self.tx
            .send(PanelRequest::StopPairing)
            .await
            .map_err(|_| eyre!("Panel channel closed"))
    }

    /// Current rows in display order
    pub async fn snapshot(&self) -> Result<Vec<crate::view::DisplayRow>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PanelRequest::Snapshot { reply_tx })
            .await
            .map_err(|_| eyre!("Panel channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Panel shutdown before reply"))
    }

    /// Current pairing state
    pub async fn pairing_state(&self) -> Result<PairingSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PanelRequest::PairingState { reply_tx })
            .await
            .map_err(|_| eyre!("Panel channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Panel shutdown before reply"))
    }

    /// Current panel metrics
    pub async fn metrics(&self) -> Result<PanelMetrics> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PanelRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| eyre!("Panel channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Panel shutdown before reply"))
    }

    /// Request panel shutdown
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(PanelRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Panel channel closed"))
    }
}
