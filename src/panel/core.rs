//! Main panel task implementation
//!
//! One task owns all mutable state: the registry map, the row list, the
//! calibration sessions, and the pairing state. Bus events, operator
//! commands, and the periodic ticks all land on this single timeline, so no
//! component ever sees concurrent mutation. Calibration requests run on
//! spawned tasks with a bounded timeout and re-enter the timeline as
//! [`PanelRequest::CalibrationReply`].

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::bus::{Bus, BusEvent, BusMessage, NodeId};
use crate::calibration::CalibrationCoordinator;
use crate::config::PanelConfig;
use crate::error::CommandError;
use crate::pairing::PairingBroadcaster;
use crate::registry::DeviceRegistry;
use crate::view::{RowSink, ViewSynchronizer};

use super::messages::{PairingSnapshot, PanelMetrics, PanelRequest, PromptInput};
use super::{PanelHandle, StatusLog};

/// The panel session: registry, view, calibration, and pairing behind one
/// sequential event loop
pub struct UwbPanel {
    config: PanelConfig,
    bus: Arc<dyn Bus>,
    ctrl_tx: mpsc::Sender<PanelRequest>,
    ctrl_rx: mpsc::Receiver<PanelRequest>,
    events_tx: mpsc::Sender<BusEvent>,
    events_rx: mpsc::Receiver<BusEvent>,
    registry: DeviceRegistry,
    sink: Box<dyn RowSink + Send>,
    log: Box<dyn StatusLog>,
}

impl UwbPanel {
    pub fn new(config: PanelConfig, bus: Arc<dyn Bus>, sink: Box<dyn RowSink + Send>, log: Box<dyn StatusLog>) -> Self {
        let (ctrl_tx, ctrl_rx) = mpsc::channel(config.control_buffer);
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
        // Subscribe at construction so events published before the task's
        // first poll are buffered rather than dropped
        let registry = DeviceRegistry::attach(config.clone(), bus.as_ref(), events_tx.clone());
        Self {
            config,
            bus,
            ctrl_tx,
            ctrl_rx,
            events_tx,
            events_rx,
            registry,
            sink,
            log,
        }
    }

    /// Create a handle for sending commands and queries to this panel
    pub fn handle(&self) -> PanelHandle {
        PanelHandle::new(self.ctrl_tx.clone())
    }

    /// Run the panel task; consumes the panel and returns after shutdown
    pub async fn run(mut self) {
        let mut registry = self.registry;
        let mut view = ViewSynchronizer::new();
        let mut coordinator = CalibrationCoordinator::new(
            self.bus.clone(),
            self.events_tx.clone(),
            self.ctrl_tx.clone(),
            self.config.request_timeout(),
        );
        let mut pairing = PairingBroadcaster::new(self.bus.clone());
        let mut metrics = PanelMetrics::default();

        let mut refresh_tick = interval(self.config.view_refresh());
        let mut pairing_tick = interval(self.config.pairing_period());

        info!("Panel started");

        loop {
            let sweep_at = registry.next_sweep();
            let sweep = async {
                match sweep_at {
                    Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    metrics.events_received += 1;
                    Self::on_bus_event(event, &mut registry, &mut view, &mut coordinator, &mut metrics, self.log.as_mut());
                }

                Some(request) = self.ctrl_rx.recv() => {
                    match request {
                        PanelRequest::StartCalibration { selected_body, golden_input } => {
                            self.log.line("Sending calibration request");
                            if let Err(error) =
                                Self::start_calibration(selected_body, &golden_input, &registry, &coordinator)
                            {
                                self.log.line(&error.to_string());
                            }
                        }

                        PanelRequest::StartPairing { selected_body, name_input } => {
                            if let Err(error) = Self::start_pairing(selected_body, &name_input, &mut pairing, self.log.as_mut()) {
                                self.log.line(&error.to_string());
                            }
                        }

                        PanelRequest::StopPairing => pairing.stop_pairing(),

                        PanelRequest::CalibrationReply { target, outcome } => match outcome {
                            Ok(response) if response.ack => {
                                self.log.line(&format!("Received calibration ACK from module {target:#04x}"));
                                coordinator.track(target);
                            }
                            Ok(_) => {
                                metrics.requests_rejected += 1;
                                self.log.line(&CommandError::RequestRejected(target).to_string());
                            }
                            Err(error) => {
                                debug!(target, %error, "Calibration request failed");
                                metrics.request_timeouts += 1;
                                self.log.line(&CommandError::RequestTimeout(target).to_string());
                            }
                        },

                        PanelRequest::Snapshot { reply_tx } => {
                            let _ = reply_tx.send(view.rows().to_vec());
                        }

                        PanelRequest::PairingState { reply_tx } => {
                            let _ = reply_tx.send(PairingSnapshot {
                                active: pairing.is_active(),
                                pending: pairing.pending().cloned(),
                            });
                        }

                        PanelRequest::GetMetrics { reply_tx } => {
                            let _ = reply_tx.send(metrics.clone());
                        }

                        PanelRequest::Shutdown => {
                            info!("Panel shutting down");
                            break;
                        }
                    }
                }

                _ = refresh_tick.tick() => {
                    view.reconcile(registry.modules(), self.sink.as_mut());
                }

                _ = pairing_tick.tick() => {
                    pairing.tick();
                }

                _ = sweep => {
                    registry.sweep_stale(Instant::now());
                }
            }
        }

        coordinator.shutdown();
        registry.close();
        pairing.reset();
        info!("Panel stopped");
    }

    fn on_bus_event(
        event: BusEvent,
        registry: &mut DeviceRegistry,
        view: &mut ViewSynchronizer,
        coordinator: &mut CalibrationCoordinator,
        metrics: &mut PanelMetrics,
        log: &mut dyn StatusLog,
    ) {
        match event.message {
            BusMessage::TransceiverStatus(status) => {
                metrics.status_reports += 1;
                registry.on_status_report(event.source_id, status, event.received);
            }
            BusMessage::CalibrationStatus(status) => {
                metrics.progress_reports += 1;
                if let Some(complete) = coordinator.on_progress(event.source_id, &status, view) {
                    metrics.calibrations_completed += 1;
                    log.line(&format!(
                        "Antenna delay for node {:#x} is {}",
                        complete.uwb_node_id, complete.antenna_delay
                    ));
                }
            }
            other => {
                warn!(source_id = event.source_id, kind = ?other.kind(), "Unexpected bus event");
            }
        }
    }

    fn start_calibration(
        selected_body: Option<crate::bus::BodyId>,
        golden_input: &PromptInput,
        registry: &DeviceRegistry,
        coordinator: &CalibrationCoordinator,
    ) -> Result<(), CommandError> {
        let body_id = selected_body.ok_or(CommandError::NoTargetSelected)?;
        let golden_trx_node_id = parse_golden_id(golden_input)?;

        let targets: Vec<NodeId> = registry
            .find_all(|entry| entry.status.body_id == body_id)
            .map(|entry| entry.source_id)
            .collect();
        coordinator.start_calibration(targets, golden_trx_node_id);
        Ok(())
    }

    fn start_pairing(
        selected_body: Option<crate::bus::BodyId>,
        name_input: &PromptInput,
        pairing: &mut PairingBroadcaster,
        log: &mut dyn StatusLog,
    ) -> Result<(), CommandError> {
        if !name_input.confirmed {
            return Err(CommandError::InvalidInput("pairing prompt cancelled".to_string()));
        }
        log.line(&format!("Trying to pair with {}", name_input.text));
        pairing.request_pairing(selected_body, &name_input.text)
    }
}

/// The golden transceiver id is entered as decimal text; anything
/// unconfirmed or non-numeric aborts before any state mutates.
fn parse_golden_id(input: &PromptInput) -> Result<u64, CommandError> {
    if !input.confirmed {
        return Err(CommandError::InvalidInput("prompt cancelled".to_string()));
    }
    input
        .text
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidInput(format!("'{}' is not a numeric node id", input.text)))
}
