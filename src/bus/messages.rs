//! Typed bus message payloads
//!
//! Payloads are decoded and validated at the transport boundary; the core
//! only ever sees these tagged records.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Bus-level identifier of a module (the sender address on the shared bus)
pub type NodeId = u8;

/// Identifier of a physical body, the unit of calibration and pairing targeting
pub type BodyId = u16;

/// Sentinel `data_slot_id` meaning no ranging slot has been allocated
pub const UNALLOCATED_SLOT: u8 = 255;

/// Transceiver role reported by a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransceiverType {
    Unknown,
    Anchor,
    Tag,
}

/// Ranging pipeline state reported by a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingState {
    Idle,
    Ranging,
    Calibrating,
}

/// Periodic self-announcement from a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransceiverStatus {
    pub uwb_node_id: u64,
    pub body_id: BodyId,
    pub data_slot_id: u8,
    pub transceiver_type: TransceiverType,
    pub packet_count: u32,
    pub processing_state: ProcessingState,
}

impl TransceiverStatus {
    /// True if no ranging data slot has been allocated yet
    pub fn is_unallocated(&self) -> bool {
        self.data_slot_id == UNALLOCATED_SLOT
    }

    /// View placement key: rows are ordered by ascending slot + body
    pub fn ordering_key(&self) -> u32 {
        u32::from(self.data_slot_id) + u32::from(self.body_id)
    }
}

/// Request to start antenna calibration on one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginCalibrationRequest {
    pub clock_trim_master: NodeId,
    pub golden_trx_node_id: u64,
}

/// Acknowledgement for [`BeginCalibrationRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginCalibrationResponse {
    pub ack: bool,
}

/// Per-module calibration progress report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationStatus {
    pub uwb_node_id: u64,
    pub progress_pct: u8,
    pub antenna_delay: u32,
}

/// Broadcast command pairing a local body with a hashed remote body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCommand {
    pub body_id: BodyId,
    pub remote_body_id: u64,
}

/// Every message the panel sends or receives on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusMessage {
    TransceiverStatus(TransceiverStatus),
    BeginCalibrationRequest(BeginCalibrationRequest),
    BeginCalibrationResponse(BeginCalibrationResponse),
    CalibrationStatus(CalibrationStatus),
    Pairing(PairingCommand),
}

impl BusMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            BusMessage::TransceiverStatus(_) => MessageKind::TransceiverStatus,
            BusMessage::BeginCalibrationRequest(_) => MessageKind::BeginCalibrationRequest,
            BusMessage::BeginCalibrationResponse(_) => MessageKind::BeginCalibrationResponse,
            BusMessage::CalibrationStatus(_) => MessageKind::CalibrationStatus,
            BusMessage::Pairing(_) => MessageKind::Pairing,
        }
    }
}

/// Message discriminant used for subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    TransceiverStatus,
    BeginCalibrationRequest,
    BeginCalibrationResponse,
    CalibrationStatus,
    Pairing,
}

/// A decoded message as delivered by the transport
#[derive(Debug, Clone)]
pub struct BusEvent {
    /// Bus-level identifier of the sender
    pub source_id: NodeId,
    /// Monotonic receipt timestamp
    pub received: Instant,
    /// Decoded payload
    pub message: BusMessage,
}
