//! uwbmon - UWB transceiver module monitor and command orchestrator
//!
//! Monitors UWB ranging modules announcing themselves on a shared bus,
//! keeps a live registry with staleness eviction, reconciles an ordered
//! displayable view of that registry incrementally, and drives two device
//! commands: antenna calibration (request/response plus per-module progress
//! tracking) and pairing (periodic broadcast of a hashed remote body id).
//!
//! # Core Concepts
//!
//! - **Single timeline**: one panel task owns every piece of mutable state;
//!   bus events, operator commands, and periodic ticks are serialized onto it
//! - **Staleness eviction**: one shared reschedule deadline per registry,
//!   pushed out by every incoming report
//! - **Stable view**: the row list is patched in place (update, remove,
//!   keyed insert); placed rows never move
//! - **Independent sessions**: each module's calibration succeeds, fails, or
//!   times out on its own
//!
//! # Modules
//!
//! - [`bus`] - transport trait, typed messages, loopback implementation
//! - [`registry`] - live module registry with staleness eviction
//! - [`view`] - ordered view synchronization
//! - [`calibration`] - calibration fan-out and progress tracking
//! - [`pairing`] - pairing command hashing and periodic broadcast
//! - [`panel`] - the session task wiring it all together

pub mod bus;
pub mod calibration;
pub mod config;
pub mod error;
pub mod pairing;
pub mod panel;
pub mod registry;
pub mod view;

// Re-export commonly used types
pub use bus::{
    BeginCalibrationRequest, BeginCalibrationResponse, BodyId, Bus, BusEvent, BusMessage, CalibrationStatus,
    LoopbackBus, MessageKind, NodeId, PairingCommand, ProcessingState, Subscription, TransceiverStatus,
    TransceiverType, UNALLOCATED_SLOT,
};
pub use calibration::{CalibrationComplete, CalibrationCoordinator};
pub use config::PanelConfig;
pub use error::{BusError, CommandError};
pub use pairing::{PairingBroadcaster, fnv1a_64};
pub use panel::{
    MemoryLog, PairingSnapshot, PanelHandle, PanelMetrics, PanelRequest, PromptInput, StatusLog, TracingLog, UwbPanel,
};
pub use registry::{DeviceRegistry, ModuleStatusEntry};
pub use view::{DisplayRow, NullRowSink, RowSink, ViewSynchronizer};
