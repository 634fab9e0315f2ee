//! CalibrationCoordinator - drives antenna calibration across one body
//!
//! One calibration-start request goes out per module sharing the target
//! body id, each with a bounded response timeout and a single attempt.
//! Modules that acknowledge get a progress-report subscription; modules that
//! time out or reject are reported and simply never tracked. Sessions are
//! fully independent of each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::{
    BeginCalibrationRequest, Bus, BusEvent, BusMessage, CalibrationStatus, MessageKind, NodeId, Subscription,
};
use crate::panel::PanelRequest;
use crate::view::ViewSynchronizer;

/// Terminal report of one module's calibration session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationComplete {
    pub source_id: NodeId,
    pub uwb_node_id: u64,
    pub antenna_delay: u32,
}

/// Issues calibration-start requests and tracks one progress subscription
/// per responding module
pub struct CalibrationCoordinator {
    bus: Arc<dyn Bus>,
    /// Sink for progress-report subscriptions (the panel event channel)
    events_tx: mpsc::Sender<BusEvent>,
    /// Route for request outcomes back onto the panel timeline
    panel_tx: mpsc::Sender<PanelRequest>,
    sessions: HashMap<NodeId, Subscription>,
    request_timeout: Duration,
}

impl CalibrationCoordinator {
    pub fn new(
        bus: Arc<dyn Bus>,
        events_tx: mpsc::Sender<BusEvent>,
        panel_tx: mpsc::Sender<PanelRequest>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            events_tx,
            panel_tx,
            sessions: HashMap::new(),
            request_timeout,
        }
    }

    /// Fire a calibration-start request at every target module.
    ///
    /// Requests run concurrently off the panel timeline; each outcome
    /// re-enters it as a [`PanelRequest::CalibrationReply`].
    pub fn start_calibration(&self, targets: Vec<NodeId>, golden_trx_node_id: u64) {
        info!(count = targets.len(), golden_trx_node_id, "Starting calibration");
        for target in targets {
            let request = BusMessage::BeginCalibrationRequest(BeginCalibrationRequest {
                clock_trim_master: 0,
                golden_trx_node_id,
            });
            let bus = self.bus.clone();
            let panel_tx = self.panel_tx.clone();
            let timeout = self.request_timeout;

            tokio::spawn(async move {
                let outcome = match bus.request(request, target, timeout).await {
                    Ok(event) => match event.message {
                        BusMessage::BeginCalibrationResponse(response) => Ok(response),
                        other => {
                            warn!(target, kind = ?other.kind(), "Unexpected calibration reply payload");
                            return;
                        }
                    },
                    Err(error) => Err(error),
                };
                let _ = panel_tx.send(PanelRequest::CalibrationReply { target, outcome }).await;
            });
        }
    }

    /// Begin tracking progress reports from a module that acknowledged
    pub fn track(&mut self, target: NodeId) {
        let bus = &self.bus;
        let events_tx = &self.events_tx;
        self.sessions
            .entry(target)
            .or_insert_with(|| bus.subscribe(MessageKind::CalibrationStatus, events_tx.clone()));
        debug!(target, "Tracking calibration progress");
    }

    pub fn is_tracking(&self, target: NodeId) -> bool {
        self.sessions.contains_key(&target)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Handle one progress report. Forwards the percentage to the view; at
    /// 100% the session reaches its terminal state, its subscription is
    /// released, and the resulting antenna delay is returned for reporting.
    /// Reports for untracked modules are no-ops.
    pub fn on_progress(
        &mut self,
        source_id: NodeId,
        status: &CalibrationStatus,
        view: &mut ViewSynchronizer,
    ) -> Option<CalibrationComplete> {
        if !self.sessions.contains_key(&source_id) {
            return None;
        }

        view.set_progress(source_id, status.progress_pct);
        if status.progress_pct < 100 {
            return None;
        }

        if let Some(mut sub) = self.sessions.remove(&source_id) {
            sub.release();
        }
        info!(source_id, antenna_delay = status.antenna_delay, "Calibration complete");
        Some(CalibrationComplete {
            source_id,
            uwb_node_id: status.uwb_node_id,
            antenna_delay: status.antenna_delay,
        })
    }

    /// Release every outstanding progress subscription regardless of
    /// completion state. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for (_, mut sub) in self.sessions.drain() {
            sub.release();
        }
    }
}

impl Drop for CalibrationCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
