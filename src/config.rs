//! Panel configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and channel configuration for a panel session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Age in milliseconds after which a module without a fresh status
    /// report is evicted from the registry
    #[serde(default = "default_stale_timeout_ms")]
    pub stale_timeout_ms: u64,

    /// Delay in milliseconds before the staleness sweep fires, rescheduled
    /// on every incoming status report
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Period of the view reconcile tick in milliseconds
    #[serde(default = "default_view_refresh_ms")]
    pub view_refresh_ms: u64,

    /// Period of the pairing broadcast tick in milliseconds
    #[serde(default = "default_pairing_period_ms")]
    pub pairing_period_ms: u64,

    /// Response timeout for calibration-start requests in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Buffer size of the bus event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Buffer size of the control channel
    #[serde(default = "default_control_buffer")]
    pub control_buffer: usize,
}

fn default_stale_timeout_ms() -> u64 {
    1000
}

fn default_refresh_delay_ms() -> u64 {
    1500
}

fn default_view_refresh_ms() -> u64 {
    500
}

fn default_pairing_period_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    1000
}

fn default_event_buffer() -> usize {
    256
}

fn default_control_buffer() -> usize {
    64
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            stale_timeout_ms: default_stale_timeout_ms(),
            refresh_delay_ms: default_refresh_delay_ms(),
            view_refresh_ms: default_view_refresh_ms(),
            pairing_period_ms: default_pairing_period_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            event_buffer: default_event_buffer(),
            control_buffer: default_control_buffer(),
        }
    }
}

impl PanelConfig {
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn view_refresh(&self) -> Duration {
        Duration::from_millis(self.view_refresh_ms)
    }

    pub fn pairing_period(&self) -> Duration {
        Duration::from_millis(self.pairing_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
