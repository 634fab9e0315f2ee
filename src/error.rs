//! Error taxonomy for operator commands and the bus boundary

use thiserror::Error;

use crate::bus::NodeId;

/// Failure of a single operator-triggered command.
///
/// All of these are local to the action that raised them; the registry and
/// view timelines keep running regardless.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// An action required a selected module/body but none was selected
    #[error("no module selected")]
    NoTargetSelected,

    /// A calibration request received no response within the timeout window
    #[error("calibration request to module {0:#04x} timed out")]
    RequestTimeout(NodeId),

    /// Explicit negative acknowledgement from the module
    #[error("module {0:#04x} rejected the calibration request")]
    RequestRejected(NodeId),

    /// Unconfirmed or malformed operator input
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Transport-level failures surfaced by the [`Bus`](crate::bus::Bus) trait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No response arrived within the request timeout
    #[error("request timed out")]
    Timeout,

    /// The bus has been torn down
    #[error("bus closed")]
    Closed,
}
