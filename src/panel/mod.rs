//! Panel session: wires registry, view, calibration, and pairing into one
//! sequential timeline

mod core;
mod handle;
mod messages;

pub use core::UwbPanel;
pub use handle::PanelHandle;
pub use messages::{PairingSnapshot, PanelMetrics, PanelRequest, PromptInput};

use std::sync::{Arc, Mutex};

use tracing::info;

/// Text-output collaborator for human-readable status lines.
///
/// Whatever viewer sits behind this is opaque to the core.
pub trait StatusLog: Send {
    fn line(&mut self, line: &str);
}

/// Writes status lines to the tracing pipeline; the default when no viewer
/// is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl StatusLog for TracingLog {
    fn line(&mut self, line: &str) {
        info!(target: "uwbmon::panel", "{line}");
    }
}

/// Collects status lines in memory; used by tests and headless embeddings
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("log lock poisoned").clone()
    }
}

impl StatusLog for MemoryLog {
    fn line(&mut self, line: &str) {
        self.lines.lock().expect("log lock poisoned").push(line.to_string());
    }
}
