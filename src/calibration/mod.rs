//! Antenna calibration fan-out and progress tracking

mod coordinator;

pub use coordinator::{CalibrationComplete, CalibrationCoordinator};
