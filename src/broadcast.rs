use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::MarketUpdate;

type Subscribers = RwLock<HashMap<u64, mpsc::UnboundedSender<Arc<MarketUpdate>>>>;

#[derive(Default)]
struct Inner {
    subscribers: Subscribers,
    next_id: AtomicU64,
}

/// Fire-and-forget fan-out of market updates to connected subscribers.
///
/// Cloning yields another handle to the same subscriber set.
#[derive(Clone, Default)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

/// Receiving end of a subscription; unregisters itself when dropped
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Arc<MarketUpdate>>,
    owner: Weak<Inner>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner.subscribers.write().insert(id, tx);
        debug!("Subscriber {} registered", id);

        Subscription {
            id,
            rx,
            owner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of currently registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Send an update to every subscriber registered at call time.
    ///
    /// Returns how many subscribers accepted it. Subscribers whose receiver
    /// has gone away are pruned.
    pub fn publish(&self, update: MarketUpdate) -> usize {
        let update = Arc::new(update);

        let snapshot: Vec<_> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in snapshot {
            if tx.send(Arc::clone(&update)).is_ok() {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.inner.subscribers.write();
            for id in &closed {
                subscribers.remove(id);
            }
            debug!("Pruned {} closed subscribers", closed.len());
        }

        delivered
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next update; None once the broadcaster is gone
    pub async fn recv(&mut self) -> Option<Arc<MarketUpdate>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.owner.upgrade() {
            inner.subscribers.write().remove(&self.id);
            debug!("Subscriber {} unregistered", self.id);
        }
    }
}
