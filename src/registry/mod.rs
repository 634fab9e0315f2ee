//! Live registry of reachable UWB modules

mod core;

pub use core::{DeviceRegistry, ModuleStatusEntry};
