//! PairingBroadcaster - periodic fire-and-forget pairing announcements

use std::sync::Arc;

use tracing::{debug, info};

use crate::bus::{BodyId, Bus, BusMessage, PairingCommand};
use crate::error::CommandError;

use super::fnv1a_64;

/// Builds the pairing command for a body and re-broadcasts it while pairing
/// mode is active.
///
/// Broadcasts are unacknowledged and repeat unconditionally each tick until
/// [`PairingBroadcaster::stop_pairing`]. Stopping only clears the active
/// flag: the held command stays in place, so resuming without a fresh
/// `request_pairing` re-broadcasts the previous command. That mirrors the
/// shipped panel behavior and is covered by a test; see DESIGN.md before
/// changing it.
pub struct PairingBroadcaster {
    bus: Arc<dyn Bus>,
    active: bool,
    pending: Option<PairingCommand>,
}

impl PairingBroadcaster {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self {
            bus,
            active: false,
            pending: None,
        }
    }

    /// Build a pairing command from the selected body and the operator-entered
    /// remote body name, then activate broadcasting.
    pub fn request_pairing(&mut self, body_id: Option<BodyId>, remote_body_name: &str) -> Result<(), CommandError> {
        let body_id = body_id.ok_or(CommandError::NoTargetSelected)?;
        let remote_body_id = fnv1a_64(remote_body_name.as_bytes());

        info!(body_id, remote_body_name, remote_body_id, "Pairing requested");
        self.pending = Some(PairingCommand { body_id, remote_body_id });
        self.active = true;
        Ok(())
    }

    /// Deactivate broadcasting; the held command is left in place
    pub fn stop_pairing(&mut self) {
        if self.active {
            info!("Pairing stopped");
        }
        self.active = false;
    }

    /// Broadcast the held command iff pairing is active and a command is held
    pub fn tick(&self) {
        if !self.active {
            return;
        }
        if let Some(command) = &self.pending {
            debug!(body_id = command.body_id, "Broadcasting pairing command");
            let _ = self.bus.broadcast(BusMessage::Pairing(command.clone()));
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending(&self) -> Option<&PairingCommand> {
        self.pending.as_ref()
    }

    /// Drop both the active flag and the held command
    pub fn reset(&mut self) {
        self.active = false;
        self.pending = None;
    }
}
