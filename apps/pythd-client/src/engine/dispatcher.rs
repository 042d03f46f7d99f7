//! Request Dispatcher
//!
//! Correlates concurrently issued requests with their asynchronous
//! responses. Each in-flight request holds a single-use slot (a oneshot
//! channel) keyed by its id; the read loop fills slots as responses
//! arrive, and connection resets release every still-pending slot so no
//! caller blocks across a reconnect.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::engine::connection::ConnectionManager;
use crate::error::ClientError;
use crate::rpc::message::{RpcRequest, RpcResponse};

// =============================================================================
// Id Sequence
// =============================================================================

/// Process-lifetime monotonic request id generator.
///
/// Ids are never reused and never reset by reconnects, which keeps every
/// id unique among pending requests without coordination.
#[derive(Debug, Default)]
pub struct IdSequence(AtomicU64);

impl IdSequence {
    /// Create a sequence whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Create a sequence whose first id is `start + 1`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    /// Issue the next id.
    #[must_use]
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// Why a pending request was released without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The connection generation ended; the response will never arrive.
    ConnectionReset,
    /// The client was deliberately stopped.
    Shutdown,
}

impl From<FailureReason> for ClientError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::ConnectionReset => Self::ConnectionReset,
            FailureReason::Shutdown => Self::Shutdown,
        }
    }
}

/// What lands in a pending request's slot.
#[derive(Debug)]
pub enum Delivery {
    /// The matching response arrived.
    Response(RpcResponse),
    /// The slot was released without a response.
    Failed(FailureReason),
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Tracks in-flight requests and hands each response to its waiter.
#[derive(Debug, Default)]
pub struct RequestDispatcher {
    ids: IdSequence,
    pending: Mutex<HashMap<u64, oneshot::Sender<Delivery>>>,
}

impl RequestDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher around an injected id sequence.
    ///
    /// Useful in tests that need predictable ids.
    #[must_use]
    pub fn with_sequence(ids: IdSequence) -> Self {
        Self {
            ids,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue the next request id.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.ids.next()
    }

    /// Register a pending request and return the receiver half of its
    /// slot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DuplicateId`] if the id is already pending;
    /// with monotonic ids this indicates a bug in the caller.
    pub fn register(&self, id: u64) -> Result<oneshot::Receiver<Delivery>, ClientError> {
        let mut pending = self.pending.lock();
        match pending.entry(id) {
            Entry::Occupied(_) => Err(ClientError::DuplicateId(id)),
            Entry::Vacant(entry) => {
                let (slot, receiver) = oneshot::channel();
                entry.insert(slot);
                Ok(receiver)
            }
        }
    }

    /// Hand a response to the waiter registered for its id.
    ///
    /// A response with no registered waiter is an orphan — the requester
    /// may have given up already (e.g. released by a reconnect) — and is
    /// logged and discarded rather than treated as an error.
    pub fn deliver(&self, id: u64, response: RpcResponse) {
        let slot = self.pending.lock().remove(&id);
        match slot {
            Some(slot) => {
                if slot.send(Delivery::Response(response)).is_err() {
                    tracing::debug!(id, "waiter gave up before its response arrived");
                }
            }
            None => {
                tracing::warn!(id, "no pending request for response id, discarding");
            }
        }
    }

    /// Remove a pending request whose waiter is giving up.
    ///
    /// Callers layering their own timeout over [`send_and_await`] must
    /// call this when the timeout fires, so an undelivered slot cannot
    /// leak.
    ///
    /// [`send_and_await`]: Self::send_and_await
    pub fn deregister(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    /// Release every pending request with the given failure.
    ///
    /// Called when a connection generation ends, so in-flight calls fail
    /// fast instead of hanging across the reconnect.
    pub fn cancel_all(&self, reason: FailureReason) {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), ?reason, "releasing pending requests");
        }
        for (_, slot) in drained {
            let _ = slot.send(Delivery::Failed(reason));
        }
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Send a request over the connection and block until its slot is
    /// filled or released.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Rpc`] if the server answered with a structured
    ///   error.
    /// - [`ClientError::ProtocolViolation`] if the delivered response id
    ///   does not match the request id.
    /// - [`ClientError::ConnectionReset`] / [`ClientError::Shutdown`] if
    ///   the slot was released without a response.
    /// - Any write-side error; the slot is deregistered before returning.
    pub async fn send_and_await(
        &self,
        conn: &ConnectionManager,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ClientError> {
        let id = self.next_id();
        let receiver = self.register(id)?;

        let request = RpcRequest::new(id, method, params);
        let text = serde_json::to_string(&request).map_err(ClientError::Encode)?;

        tracing::debug!(id, method, "sending request");
        if let Err(e) = conn.write(text).await {
            self.deregister(id);
            return Err(e);
        }

        match receiver.await {
            Ok(Delivery::Response(response)) => {
                if response.id != id {
                    return Err(ClientError::ProtocolViolation {
                        expected: id,
                        actual: response.id,
                    });
                }
                if let Some(error) = response.error {
                    return Err(ClientError::Rpc {
                        code: error.code,
                        message: error.message,
                    });
                }
                Ok(response.result.unwrap_or(Value::Null))
            }
            Ok(Delivery::Failed(reason)) => Err(reason.into()),
            // The slot sender was dropped without a delivery; only
            // possible if the engine itself is being torn down.
            Err(_) => Err(ClientError::ConnectionReset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectSettings;

    fn response(id: u64) -> RpcResponse {
        RpcResponse {
            id,
            result: Some(Value::from(0)),
            error: None,
        }
    }

    #[test]
    fn ids_are_monotonic() {
        let ids = IdSequence::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);

        let offset = IdSequence::starting_at(41);
        assert_eq!(offset.next(), 42);
    }

    #[test]
    fn injected_sequence_controls_ids() {
        let dispatcher = RequestDispatcher::with_sequence(IdSequence::starting_at(99));
        assert_eq!(dispatcher.next_id(), 100);
        assert_eq!(dispatcher.next_id(), 101);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let dispatcher = RequestDispatcher::new();
        let _slot = dispatcher.register(7).unwrap();
        assert!(matches!(
            dispatcher.register(7),
            Err(ClientError::DuplicateId(7))
        ));
    }

    #[tokio::test]
    async fn deliver_wakes_the_matching_waiter() {
        let dispatcher = RequestDispatcher::new();
        let receiver = dispatcher.register(3).unwrap();

        dispatcher.deliver(3, response(3));

        match receiver.await.unwrap() {
            Delivery::Response(r) => assert_eq!(r.id, 3),
            Delivery::Failed(reason) => panic!("unexpected failure: {reason:?}"),
        }
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[test]
    fn orphan_response_is_discarded() {
        let dispatcher = RequestDispatcher::new();
        let _slot = dispatcher.register(1).unwrap();

        // no waiter for id 99; must not panic or disturb id 1
        dispatcher.deliver(99, response(99));
        assert_eq!(dispatcher.pending_count(), 1);
    }

    #[tokio::test]
    async fn cancel_all_releases_every_waiter() {
        let dispatcher = RequestDispatcher::new();
        let first = dispatcher.register(1).unwrap();
        let second = dispatcher.register(2).unwrap();

        dispatcher.cancel_all(FailureReason::ConnectionReset);

        for receiver in [first, second] {
            match receiver.await.unwrap() {
                Delivery::Failed(FailureReason::ConnectionReset) => {}
                other => panic!("expected connection reset, got {other:?}"),
            }
        }
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[test]
    fn deregister_removes_the_slot() {
        let dispatcher = RequestDispatcher::new();
        let _slot = dispatcher.register(5).unwrap();
        dispatcher.deregister(5);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn send_without_connection_fails_fast_and_leaks_nothing() {
        let dispatcher = RequestDispatcher::new();
        let conn = ConnectionManager::new(
            "ws://127.0.0.1:1".to_string(),
            ReconnectSettings::default(),
        );

        let result = dispatcher
            .send_and_await(&conn, "get_product_list", None)
            .await;

        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert_eq!(dispatcher.pending_count(), 0);
    }
}
