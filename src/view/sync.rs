//! Incremental reconciliation of the displayed row list
//!
//! The synchronizer keeps the materialized row list in step with registry
//! snapshots without rebuilding it: surviving rows are updated in place,
//! vanished rows are removed, and new rows are inserted by ordering key.
//! Already-placed rows never move, even if later insertions would make the
//! list locally out of order against the key. That is a deliberate
//! stability-over-strict-ordering choice: it avoids row identity churn in
//! whatever widget mirrors the sink.

use std::collections::HashMap;

use tracing::debug;

use crate::bus::{NodeId, TransceiverStatus};
use crate::registry::ModuleStatusEntry;

use super::RowSink;

/// One materialized row of the module view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub source_id: NodeId,
    pub status: TransceiverStatus,
    /// Calibration progress, 0-100. Locally owned: survives status updates,
    /// dropped with the row.
    pub progress_pct: u8,
}

impl DisplayRow {
    /// Placement key for the insertion pass
    pub fn ordering_key(&self) -> u32 {
        self.status.ordering_key()
    }
}

/// Reconciles the ordered row list against registry snapshots
#[derive(Debug, Default)]
pub struct ViewSynchronizer {
    rows: Vec<DisplayRow>,
}

impl ViewSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the row list in step with `live`, mirroring every edit to
    /// `sink`. Runs three passes; their order is what keeps the removal
    /// indices valid.
    pub fn reconcile(&mut self, live: &HashMap<NodeId, ModuleStatusEntry>, sink: &mut dyn RowSink) {
        // Pass 1: refresh surviving rows, collect the indices of vanished ones.
        // Stored progress rides along untouched.
        let mut rows_to_remove = Vec::new();
        for (index, row) in self.rows.iter_mut().enumerate() {
            match live.get(&row.source_id) {
                Some(entry) => {
                    row.status = entry.status.clone();
                    sink.update_row(index, row);
                }
                None => rows_to_remove.push(index),
            }
        }

        // Pass 2: remove from the end so the remaining indices stay valid
        for &index in rows_to_remove.iter().rev() {
            debug!(index, source_id = self.rows[index].source_id, "Removing row");
            self.rows.remove(index);
            sink.remove_row(index);
        }

        // Pass 3: place each new module before the first row with a larger
        // ordering key, else append. Sorted by id only to make placement
        // deterministic when several modules appear in one snapshot.
        let mut new_ids: Vec<NodeId> = live
            .keys()
            .copied()
            .filter(|id| !self.rows.iter().any(|row| row.source_id == *id))
            .collect();
        new_ids.sort_unstable();

        for source_id in new_ids {
            let entry = &live[&source_id];
            let key = entry.status.ordering_key();
            let index = self
                .rows
                .iter()
                .position(|row| row.ordering_key() > key)
                .unwrap_or(self.rows.len());

            let row = DisplayRow {
                source_id,
                status: entry.status.clone(),
                progress_pct: 0,
            };
            debug!(index, source_id, key, "Inserting row");
            self.rows.insert(index, row);
            sink.insert_row(index, &self.rows[index]);
        }
    }

    /// Update the stored progress for a displayed module; silently no-ops
    /// if the module is not currently displayed. The new value reaches the
    /// sink on the next reconcile.
    pub fn set_progress(&mut self, source_id: NodeId, progress_pct: u8) {
        if let Some(row) = self.rows.iter_mut().find(|row| row.source_id == source_id) {
            row.progress_pct = progress_pct;
        }
    }

    /// Current rows in display order
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
