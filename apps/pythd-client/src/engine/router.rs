//! Subscription Router
//!
//! Maps server-assigned subscription ids to per-subscriber notification
//! sinks. Notifications carry no payload beyond "something changed";
//! subscribers re-query state when signalled, so delivery is a bounded
//! non-blocking edge-trigger: a full queue drops the signal rather than
//! stalling the read loop behind a slow subscriber.

use std::collections::HashMap;
use std::mem;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Receiver half of a subscription's notification channel.
///
/// Each received `()` means the oracle signalled this subscription. The
/// channel closing (`recv()` returning `None`) means the subscription no
/// longer exists — the connection was reset or [`unsubscribe`] was
/// called — and the subscriber must resubscribe.
///
/// [`unsubscribe`]: SubscriptionRouter::unsubscribe
pub type SignalReceiver = mpsc::Receiver<()>;

/// Routes unsolicited notifications to the matching subscriber.
#[derive(Debug)]
pub struct SubscriptionRouter {
    sinks: Mutex<HashMap<u64, mpsc::Sender<()>>>,
    capacity: usize,
}

impl SubscriptionRouter {
    /// Create a router whose sinks buffer up to `capacity` undelivered
    /// signals each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Record a mapping for a server-assigned subscription id and return
    /// the subscriber's receiver.
    ///
    /// Re-subscribing an id that is already mapped replaces the old sink,
    /// closing its receiver.
    #[must_use]
    pub fn subscribe(&self, subscription: u64) -> SignalReceiver {
        let (sink, receiver) = mpsc::channel(self.capacity);
        self.sinks.lock().insert(subscription, sink);
        receiver
    }

    /// Deliver a zero-payload signal to the sink for `subscription`.
    ///
    /// Never blocks: a full queue drops the signal (the queued one
    /// already tells the subscriber to re-query), and a sink whose
    /// receiver is gone is pruned.
    pub fn notify(&self, subscription: u64) {
        let mut sinks = self.sinks.lock();
        match sinks.get(&subscription) {
            Some(sink) => match sink.try_send(()) {
                Ok(()) => {}
                Err(TrySendError::Full(())) => {
                    tracing::debug!(subscription, "subscriber lagging, dropping signal");
                }
                Err(TrySendError::Closed(())) => {
                    sinks.remove(&subscription);
                    tracing::debug!(subscription, "subscriber gone, pruning subscription");
                }
            },
            None => {
                tracing::warn!(subscription, "notification for unknown subscription");
            }
        }
    }

    /// Close every sink and clear the map.
    ///
    /// Called on connection reset: all server-side subscription state is
    /// gone, so every subscriber observes closure and must resubscribe
    /// against the new generation.
    pub fn invalidate_all(&self) {
        let drained = mem::take(&mut *self.sinks.lock());
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "invalidating subscriptions");
        }
        // dropping the senders closes every receiver
    }

    /// Remove one subscription, closing its sink.
    ///
    /// Returns whether the id was mapped.
    pub fn unsubscribe(&self, subscription: u64) -> bool {
        self.sinks.lock().remove(&subscription).is_some()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.sinks.lock().len()
    }
}
