//! Integration tests for the UWB panel
//!
//! These tests verify end-to-end behavior of the panel task over the
//! loopback bus: status ingestion through view reconciliation, the full
//! calibration flow, and pairing broadcast gating.

use std::sync::Arc;
use std::time::Duration;

use uwbmon::{
    BeginCalibrationResponse, BusMessage, CalibrationStatus, LoopbackBus, MemoryLog, NodeId, NullRowSink, PairingCommand,
    PanelConfig, PanelHandle, ProcessingState, PromptInput, TransceiverStatus, TransceiverType, UwbPanel, fnv1a_64,
};

fn fast_config() -> PanelConfig {
    PanelConfig {
        stale_timeout_ms: 100,
        refresh_delay_ms: 150,
        view_refresh_ms: 20,
        pairing_period_ms: 20,
        request_timeout_ms: 50,
        ..Default::default()
    }
}

fn status(body_id: u16, data_slot_id: u8) -> BusMessage {
    BusMessage::TransceiverStatus(TransceiverStatus {
        uwb_node_id: 0x1000 + u64::from(data_slot_id),
        body_id,
        data_slot_id,
        transceiver_type: TransceiverType::Anchor,
        packet_count: 5,
        processing_state: ProcessingState::Ranging,
    })
}

fn progress(uwb_node_id: u64, pct: u8, antenna_delay: u32) -> BusMessage {
    BusMessage::CalibrationStatus(CalibrationStatus {
        uwb_node_id,
        progress_pct: pct,
        antenna_delay,
    })
}

fn spawn_panel(bus: &LoopbackBus, config: PanelConfig) -> (PanelHandle, MemoryLog, tokio::task::JoinHandle<()>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let log = MemoryLog::new();
    let panel = UwbPanel::new(
        config,
        Arc::new(bus.clone()),
        Box::new(NullRowSink),
        Box::new(log.clone()),
    );
    let handle = panel.handle();
    let task = tokio::spawn(panel.run());
    (handle, log, task)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}

// =============================================================================
// Registry + View Tests
// =============================================================================

#[tokio::test]
async fn test_status_reports_materialize_ordered_rows() {
    let bus = LoopbackBus::new();
    // Long staleness window: this test is about placement, not eviction
    let (handle, _log, task) = spawn_panel(&bus, calibration_config());

    // Arrival order 5, 1, 3 by ordering key
    bus.publish(10, status(0, 5));
    settle().await;
    bus.publish(11, status(0, 1));
    settle().await;
    bus.publish(12, status(0, 3));
    settle().await;

    let rows = handle.snapshot().await.unwrap();
    let ids: Vec<NodeId> = rows.iter().map(|row| row.source_id).collect();
    assert_eq!(ids, vec![11, 12, 10]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_silent_modules_are_evicted_from_view() {
    let bus = LoopbackBus::new();
    let (handle, _log, task) = spawn_panel(&bus, fast_config());

    bus.publish(10, status(0, 1));
    settle().await;
    assert_eq!(handle.snapshot().await.unwrap().len(), 1);

    // Stop reporting: the sweep fires at +150ms, the timeout is 100ms
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(handle.snapshot().await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_fresh_reports_keep_module_alive() {
    let bus = LoopbackBus::new();
    let (handle, _log, task) = spawn_panel(&bus, fast_config());

    for _ in 0..6 {
        bus.publish(10, status(0, 1));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(handle.snapshot().await.unwrap().len(), 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

// =============================================================================
// Calibration Tests
// =============================================================================

fn calibration_config() -> PanelConfig {
    // Long staleness window so modules stay registered without a feeder task
    PanelConfig {
        stale_timeout_ms: 60_000,
        refresh_delay_ms: 60_000,
        view_refresh_ms: 20,
        request_timeout_ms: 50,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_calibration_progress_and_completion() {
    let bus = LoopbackBus::new();
    bus.set_responder(10, |_| {
        Some(BusMessage::BeginCalibrationResponse(BeginCalibrationResponse {
            ack: true,
        }))
    });
    let (handle, log, task) = spawn_panel(&bus, calibration_config());

    bus.publish(10, status(7, 1));
    settle().await;

    handle
        .start_calibration(Some(7), PromptInput::confirmed("85"))
        .await
        .unwrap();
    settle().await;
    assert!(log.lines().iter().any(|line| line.contains("ACK from module 0x0a")));

    bus.publish(10, progress(0x1001, 40, 0));
    settle().await;
    let rows = handle.snapshot().await.unwrap();
    assert_eq!(rows[0].progress_pct, 40);

    bus.publish(10, progress(0x1001, 100, 16450));
    settle().await;
    assert!(
        log.lines()
            .iter()
            .any(|line| line.contains("Antenna delay") && line.contains("16450"))
    );

    let metrics = handle.metrics().await.unwrap();
    assert_eq!(metrics.calibrations_completed, 1);

    // Session is gone: a late report changes nothing
    bus.publish(10, progress(0x1001, 100, 99999));
    settle().await;
    assert_eq!(handle.metrics().await.unwrap().calibrations_completed, 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_calibration_failures_are_independent() {
    let bus = LoopbackBus::new();
    // Module 10 acks, 11 rejects, 12 never answers
    bus.set_responder(10, |_| {
        Some(BusMessage::BeginCalibrationResponse(BeginCalibrationResponse {
            ack: true,
        }))
    });
    bus.set_responder(11, |_| {
        Some(BusMessage::BeginCalibrationResponse(BeginCalibrationResponse {
            ack: false,
        }))
    });
    let (handle, log, task) = spawn_panel(&bus, calibration_config());

    bus.publish(10, status(7, 1));
    bus.publish(11, status(7, 2));
    bus.publish(12, status(7, 3));
    settle().await;

    handle
        .start_calibration(Some(7), PromptInput::confirmed("85"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let metrics = handle.metrics().await.unwrap();
    assert_eq!(metrics.requests_rejected, 1);
    assert_eq!(metrics.request_timeouts, 1);
    assert!(log.lines().iter().any(|line| line.contains("rejected")));
    assert!(log.lines().iter().any(|line| line.contains("timed out")));

    // The acknowledging module still completes
    bus.publish(10, progress(0x1001, 100, 123));
    settle().await;
    assert_eq!(handle.metrics().await.unwrap().calibrations_completed, 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_calibration_targets_only_selected_body() {
    let bus = LoopbackBus::new();
    bus.set_responder(10, |_| {
        Some(BusMessage::BeginCalibrationResponse(BeginCalibrationResponse {
            ack: true,
        }))
    });
    bus.set_responder(20, |_| {
        Some(BusMessage::BeginCalibrationResponse(BeginCalibrationResponse {
            ack: true,
        }))
    });
    let (handle, log, task) = spawn_panel(&bus, calibration_config());

    bus.publish(10, status(7, 1));
    bus.publish(20, status(9, 2));
    settle().await;

    handle
        .start_calibration(Some(7), PromptInput::confirmed("85"))
        .await
        .unwrap();
    settle().await;

    // Only the module on body 7 was asked
    assert!(log.lines().iter().any(|line| line.contains("0x0a")));
    assert!(!log.lines().iter().any(|line| line.contains("0x14")));

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

// =============================================================================
// Pairing Tests
// =============================================================================

#[tokio::test]
async fn test_pairing_broadcasts_while_active_only() {
    let bus = LoopbackBus::new();
    let (handle, _log, task) = spawn_panel(&bus, fast_config());

    // Inactive: ticks produce nothing
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(bus.broadcasts().is_empty());

    handle
        .start_pairing(Some(7), PromptInput::confirmed("remote-body"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sent = bus.broadcasts();
    assert!(sent.len() >= 2, "expected repeated broadcasts, got {}", sent.len());
    assert_eq!(
        sent[0],
        BusMessage::Pairing(PairingCommand {
            body_id: 7,
            remote_body_id: fnv1a_64(b"remote-body"),
        })
    );

    handle.stop_pairing().await.unwrap();
    // Let in-flight ticks drain, then confirm the count is frozen
    tokio::time::sleep(Duration::from_millis(40)).await;
    let frozen = bus.broadcasts().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bus.broadcasts().len(), frozen);

    // The held command deliberately survives the stop
    let state = handle.pairing_state().await.unwrap();
    assert!(!state.active);
    assert!(state.pending.is_some());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_pairing_requires_selection_and_confirmation() {
    let bus = LoopbackBus::new();
    let (handle, log, task) = spawn_panel(&bus, fast_config());

    handle
        .start_pairing(None, PromptInput::confirmed("remote"))
        .await
        .unwrap();
    handle
        .start_pairing(Some(7), PromptInput::cancelled())
        .await
        .unwrap();
    let _ = handle.metrics().await.unwrap();

    assert!(log.lines().iter().any(|line| line == "no module selected"));
    assert!(log.lines().iter().any(|line| line.contains("cancelled")));

    let state = handle.pairing_state().await.unwrap();
    assert!(!state.active);
    assert!(state.pending.is_none());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(bus.broadcasts().is_empty());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}
