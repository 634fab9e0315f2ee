//! Bus transport boundary
//!
//! The panel never talks to a concrete transport directly; everything goes
//! through the [`Bus`] trait. Subscriptions deliver decoded [`BusEvent`]s
//! into a caller-supplied channel, requests are asynchronous with a bounded
//! timeout, and broadcasts are fire-and-forget.

mod loopback;
mod messages;

pub use loopback::LoopbackBus;
pub use messages::{
    BeginCalibrationRequest, BeginCalibrationResponse, BodyId, BusEvent, BusMessage, CalibrationStatus, MessageKind,
    NodeId, PairingCommand, ProcessingState, TransceiverStatus, TransceiverType, UNALLOCATED_SLOT,
};

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::BusError;

/// Abstract message bus the panel runs against
#[async_trait]
pub trait Bus: Send + Sync {
    /// Subscribe to all messages of `kind`; delivered events are pushed into
    /// `tx`. The returned handle unsubscribes on [`Subscription::release`]
    /// or drop.
    fn subscribe(&self, kind: MessageKind, tx: mpsc::Sender<BusEvent>) -> Subscription;

    /// Send a request to one module and wait for its response, bounded by
    /// `timeout`. A missing response surfaces as [`BusError::Timeout`].
    async fn request(&self, message: BusMessage, destination: NodeId, timeout: Duration) -> Result<BusEvent, BusError>;

    /// Fire-and-forget broadcast to every module on the bus
    fn broadcast(&self, message: BusMessage) -> Result<(), BusError>;
}

/// Opaque handle for an active message subscription.
///
/// Releasing twice is a no-op; dropping the handle releases it.
pub struct Subscription {
    id: u64,
    kind: MessageKind,
    releaser: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(id: u64, kind: MessageKind, releaser: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            id,
            kind,
            releaser: Some(releaser),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Unsubscribe from the bus; idempotent
    pub fn release(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            debug!(id = self.id, kind = ?self.kind, "Releasing subscription");
            releaser();
        }
    }

    /// True if the subscription has not been released yet
    pub fn is_active(&self) -> bool {
        self.releaser.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}
