//! DeviceRegistry - latest status report per module with staleness eviction

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::bus::{Bus, BusEvent, MessageKind, NodeId, Subscription, TransceiverStatus};
use crate::config::PanelConfig;

/// Latest status report from one module
#[derive(Debug, Clone)]
pub struct ModuleStatusEntry {
    /// Bus-level identifier of the reporting module (unique key)
    pub source_id: NodeId,
    /// The most recent decoded status payload
    pub status: TransceiverStatus,
    /// Monotonic timestamp of the most recent report
    pub last_seen: Instant,
}

/// Holds the latest status report per module and evicts entries whose last
/// report has aged past the staleness timeout.
///
/// A single sweep deadline is shared by the whole registry: every incoming
/// report pushes it out to `now + refresh_delay`, so timer bookkeeping stays
/// O(1) at the cost of small staleness-detection latency variance. Reports
/// arrive far more often than the timeout window, so the variance is
/// negligible in practice.
pub struct DeviceRegistry {
    modules: HashMap<NodeId, ModuleStatusEntry>,
    status_sub: Option<Subscription>,
    sweep_deadline: Option<Instant>,
    config: PanelConfig,
}

impl DeviceRegistry {
    /// Create a registry subscribed to status reports on `bus`, delivering
    /// events into `events_tx`
    pub fn attach(config: PanelConfig, bus: &dyn Bus, events_tx: mpsc::Sender<BusEvent>) -> Self {
        let status_sub = bus.subscribe(MessageKind::TransceiverStatus, events_tx);
        Self {
            modules: HashMap::new(),
            status_sub: Some(status_sub),
            sweep_deadline: None,
            config,
        }
    }

    /// Create a detached registry (no bus subscription); used by unit tests
    /// and embeddings that route events themselves
    pub fn new(config: PanelConfig) -> Self {
        Self {
            modules: HashMap::new(),
            status_sub: None,
            sweep_deadline: None,
            config,
        }
    }

    /// Ingest one status report: insert or wholesale-replace the entry for
    /// `source_id`, reschedule the shared sweep deadline, then sweep eagerly.
    pub fn on_status_report(&mut self, source_id: NodeId, status: TransceiverStatus, now: Instant) {
        debug!(source_id, body_id = status.body_id, "Status report");
        self.modules.insert(
            source_id,
            ModuleStatusEntry {
                source_id,
                status,
                last_seen: now,
            },
        );
        self.sweep_deadline = Some(now + self.config.refresh_delay());
        self.sweep_stale(now);
    }

    /// Evict every entry whose last report is older than the staleness
    /// timeout; clears the pending sweep deadline.
    pub fn sweep_stale(&mut self, now: Instant) {
        let timeout = self.config.stale_timeout();
        self.modules.retain(|source_id, entry| {
            let fresh = entry.last_seen + timeout >= now;
            if !fresh {
                info!(source_id, "Evicting stale module");
            }
            fresh
        });
        if self.sweep_deadline.is_some_and(|deadline| deadline <= now) {
            self.sweep_deadline = None;
        }
    }

    /// Entries satisfying `predicate`, in unspecified order. Each call
    /// re-iterates current state.
    pub fn find_all<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a ModuleStatusEntry>
    where
        P: Fn(&ModuleStatusEntry) -> bool + 'a,
    {
        self.modules.values().filter(move |entry| predicate(entry))
    }

    /// The full entry map, keyed by `source_id`
    pub fn modules(&self) -> &HashMap<NodeId, ModuleStatusEntry> {
        &self.modules
    }

    /// When the rescheduled staleness sweep should next fire, if at all
    pub fn next_sweep(&self) -> Option<Instant> {
        self.sweep_deadline
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Release the bus subscription; the registry becomes inert. Safe to
    /// call more than once.
    pub fn close(&mut self) {
        if let Some(mut sub) = self.status_sub.take() {
            sub.release();
            info!("Registry closed");
        }
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ProcessingState, TransceiverType};
    use std::time::Duration;

    fn status(body_id: u16) -> TransceiverStatus {
        TransceiverStatus {
            uwb_node_id: 0x100,
            body_id,
            data_slot_id: 0,
            transceiver_type: TransceiverType::Tag,
            packet_count: 1,
            processing_state: ProcessingState::Ranging,
        }
    }

    #[test]
    fn test_eviction_after_timeout() {
        let mut registry = DeviceRegistry::new(PanelConfig::default());
        let t0 = Instant::now();

        registry.on_status_report(1, status(1), t0);
        registry.on_status_report(2, status(1), t0 + Duration::from_millis(800));
        assert_eq!(registry.len(), 2);

        // Only the first entry has aged past the 1s timeout
        registry.sweep_stale(t0 + Duration::from_millis(1500));
        assert_eq!(registry.len(), 1);
        assert!(registry.modules().contains_key(&2));
    }

    #[test]
    fn test_report_replaces_wholesale() {
        let mut registry = DeviceRegistry::new(PanelConfig::default());
        let t0 = Instant::now();

        let mut first = status(1);
        first.packet_count = 10;
        registry.on_status_report(1, first, t0);

        let mut second = status(2);
        second.packet_count = 3;
        registry.on_status_report(1, second.clone(), t0 + Duration::from_millis(100));

        assert_eq!(registry.len(), 1);
        let entry = &registry.modules()[&1];
        assert_eq!(entry.status, second);
        assert_eq!(entry.last_seen, t0 + Duration::from_millis(100));
    }

    #[test]
    fn test_find_all_filters() {
        let mut registry = DeviceRegistry::new(PanelConfig::default());
        let t0 = Instant::now();
        registry.on_status_report(1, status(7), t0);
        registry.on_status_report(2, status(7), t0);
        registry.on_status_report(3, status(9), t0);

        let on_body: Vec<NodeId> = registry
            .find_all(|entry| entry.status.body_id == 7)
            .map(|entry| entry.source_id)
            .collect();
        assert_eq!(on_body.len(), 2);
        assert!(on_body.contains(&1) && on_body.contains(&2));
    }

    #[test]
    fn test_report_reschedules_sweep() {
        let mut registry = DeviceRegistry::new(PanelConfig::default());
        let t0 = Instant::now();

        assert!(registry.next_sweep().is_none());
        registry.on_status_report(1, status(1), t0);
        assert_eq!(registry.next_sweep(), Some(t0 + Duration::from_millis(1500)));

        // A later report pushes the deadline out
        let t1 = t0 + Duration::from_millis(400);
        registry.on_status_report(2, status(1), t1);
        assert_eq!(registry.next_sweep(), Some(t1 + Duration::from_millis(1500)));
    }

    #[test]
    fn test_sweep_clears_elapsed_deadline() {
        let mut registry = DeviceRegistry::new(PanelConfig::default());
        let t0 = Instant::now();
        registry.on_status_report(1, status(1), t0);

        registry.sweep_stale(t0 + Duration::from_millis(1600));
        assert!(registry.next_sweep().is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let bus = crate::bus::LoopbackBus::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut registry = DeviceRegistry::attach(PanelConfig::default(), &bus, tx);
        assert_eq!(bus.subscriber_count(MessageKind::TransceiverStatus), 1);

        registry.close();
        registry.close();
        assert_eq!(bus.subscriber_count(MessageKind::TransceiverStatus), 0);
    }
}
