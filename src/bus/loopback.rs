//! In-process loopback bus
//!
//! Used by the test suites and by embeddings that bridge a real transport in
//! a separate task. Events are injected with [`LoopbackBus::publish`],
//! request responses are scripted per destination node, and broadcasts are
//! recorded for inspection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::{BusEvent, BusMessage, MessageKind, NodeId};
use super::{Bus, Subscription};
use crate::error::BusError;

type Responder = Box<dyn Fn(&BusMessage) -> Option<BusMessage> + Send + Sync>;

#[derive(Default)]
struct Inner {
    next_sub_id: u64,
    subscribers: HashMap<MessageKind, Vec<(u64, mpsc::Sender<BusEvent>)>>,
    responders: HashMap<NodeId, Responder>,
    broadcasts: Vec<BusMessage>,
}

/// Loopback implementation of [`Bus`]
#[derive(Clone, Default)]
pub struct LoopbackBus {
    inner: Arc<Mutex<Inner>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject an event as if `source_id` had sent it on the wire
    pub fn publish(&self, source_id: NodeId, message: BusMessage) {
        let kind = message.kind();
        let event = BusEvent {
            source_id,
            received: Instant::now(),
            message,
        };

        let mut inner = self.inner.lock().expect("loopback bus lock poisoned");
        if let Some(subs) = inner.subscribers.get_mut(&kind) {
            subs.retain(|(id, tx)| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(sub_id = id, ?kind, "Subscriber channel full, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
    }

    /// Script the response `destination` gives to incoming requests.
    ///
    /// A responder returning `None`, or no responder at all, makes requests
    /// to that node time out.
    pub fn set_responder<F>(&self, destination: NodeId, responder: F)
    where
        F: Fn(&BusMessage) -> Option<BusMessage> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("loopback bus lock poisoned");
        inner.responders.insert(destination, Box::new(responder));
    }

    /// Every message broadcast so far, oldest first
    pub fn broadcasts(&self) -> Vec<BusMessage> {
        let inner = self.inner.lock().expect("loopback bus lock poisoned");
        inner.broadcasts.clone()
    }

    /// Number of live subscriptions for `kind`
    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        let inner = self.inner.lock().expect("loopback bus lock poisoned");
        inner.subscribers.get(&kind).map_or(0, Vec::len)
    }
}

#[async_trait]
impl Bus for LoopbackBus {
    fn subscribe(&self, kind: MessageKind, tx: mpsc::Sender<BusEvent>) -> Subscription {
        let mut inner = self.inner.lock().expect("loopback bus lock poisoned");
        inner.next_sub_id += 1;
        let id = inner.next_sub_id;
        inner.subscribers.entry(kind).or_default().push((id, tx));
        debug!(sub_id = id, ?kind, "Subscribed");

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(
            id,
            kind,
            Box::new(move || {
                if let Some(inner) = weak.upgrade()
                    && let Ok(mut inner) = inner.lock()
                    && let Some(subs) = inner.subscribers.get_mut(&kind)
                {
                    subs.retain(|(sub_id, _)| *sub_id != id);
                }
            }),
        )
    }

    async fn request(&self, message: BusMessage, destination: NodeId, timeout: Duration) -> Result<BusEvent, BusError> {
        let response = {
            let inner = self.inner.lock().expect("loopback bus lock poisoned");
            inner.responders.get(&destination).and_then(|responder| responder(&message))
        };

        match response {
            Some(message) => Ok(BusEvent {
                source_id: destination,
                received: Instant::now(),
                message,
            }),
            None => {
                // Nobody answers: burn the full timeout window like a real bus would
                tokio::time::sleep(timeout).await;
                Err(BusError::Timeout)
            }
        }
    }

    fn broadcast(&self, message: BusMessage) -> Result<(), BusError> {
        debug!(kind = ?message.kind(), "Broadcast");
        let mut inner = self.inner.lock().expect("loopback bus lock poisoned");
        inner.broadcasts.push(message);
        Ok(())
    }
}
