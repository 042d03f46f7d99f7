//! Pythd Client
//!
//! The public surface over the connection engine. One [`PythClient`]
//! holds one persistent connection to the oracle daemon; any number of
//! tasks may issue calls concurrently, and each call is matched to its
//! own response by the engine.
//!
//! RPC methods are thin translators: they serialize parameters, hand the
//! call to the dispatcher, and decode the result payload into typed
//! records.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::engine::connection::ConnectionManager;
use crate::engine::dispatcher::RequestDispatcher;
use crate::engine::read_loop;
use crate::engine::router::{SignalReceiver, SubscriptionRouter};
use crate::error::ClientError;
use crate::product::{PriceStatus, Product, ProductSummary};
use crate::rpc::message::SubscriptionParams;

// =============================================================================
// Shared Engine State
// =============================================================================

/// Engine state shared between the client handle and the read loop task.
pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) dispatcher: RequestDispatcher,
    pub(crate) router: SubscriptionRouter,
    pub(crate) conn: ConnectionManager,
    pub(crate) cancel: CancellationToken,
}

// =============================================================================
// Subscription Handle
// =============================================================================

/// A live price-schedule subscription.
///
/// The oracle signals through `signals` each time the price for the
/// subscribed account should be re-published. The channel closing means
/// the connection was reset and the subscription no longer exists; the
/// caller must resubscribe once the client is connected again.
pub struct PriceSchedSubscription {
    /// Server-assigned subscription id.
    pub id: u64,
    /// Zero-payload schedule signals.
    pub signals: SignalReceiver,
}

// =============================================================================
// Client
// =============================================================================

/// Client for the pythd price-oracle RPC API.
///
/// Owns one persistent websocket connection. Requests issued while the
/// connection is down fail fast with [`ClientError::NotConnected`];
/// requests in flight when the connection drops fail with
/// [`ClientError::ConnectionReset`]. The engine redials forever in the
/// background until [`close`](Self::close) is called.
pub struct PythClient {
    inner: Arc<ClientInner>,
}

impl PythClient {
    /// Dial the oracle and start the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dial`] if the initial connection attempt
    /// fails; unlike later redials, the first dial is not retried.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let conn = ConnectionManager::new(config.url.clone(), config.reconnect.clone());
        let router = SubscriptionRouter::new(config.notification_capacity);

        let inner = Arc::new(ClientInner {
            dispatcher: RequestDispatcher::new(),
            router,
            conn,
            cancel: CancellationToken::new(),
            config,
        });

        let read = inner.conn.dial().await?;
        tokio::spawn(read_loop::run(Arc::clone(&inner), read));

        Ok(Self { inner })
    }

    /// Fetch full product records: account, attributes, and nested price
    /// and publisher accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or the result decoding fails.
    pub async fn get_all_products(&self) -> Result<Vec<Product>, ClientError> {
        let result = self.call("get_all_products", None).await?;
        serde_json::from_value(result).map_err(ClientError::Decode)
    }

    /// Fetch summary product records: account, attributes, and
    /// price-account stubs.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or the result decoding fails.
    pub async fn get_product_list(&self) -> Result<Vec<ProductSummary>, ClientError> {
        let result = self.call("get_product_list", None).await?;
        serde_json::from_value(result).map_err(ClientError::Decode)
    }

    /// Subscribe to the publish schedule for a price account.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or the result decoding fails.
    pub async fn subscribe_price_sched(
        &self,
        account: &str,
    ) -> Result<PriceSchedSubscription, ClientError> {
        let params = serde_json::json!({ "account": account });
        let result = self.call("subscribe_price_sched", Some(params)).await?;

        let reply: SubscriptionParams =
            serde_json::from_value(result).map_err(ClientError::Decode)?;
        let signals = self.inner.router.subscribe(reply.subscription);

        tracing::info!(
            account,
            subscription = reply.subscription,
            "price schedule subscription established"
        );

        Ok(PriceSchedSubscription {
            id: reply.subscription,
            signals,
        })
    }

    /// Publish a price for an account.
    ///
    /// `price` and `conf` are scaled integers per the account's price
    /// exponent. The daemon acknowledges with 0; a non-zero
    /// acknowledgement is logged but not treated as a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn update_price(
        &self,
        account: &str,
        price: i64,
        conf: u64,
        status: PriceStatus,
    ) -> Result<(), ClientError> {
        let params = serde_json::json!({
            "account": account,
            "price": price,
            "conf": conf,
            "status": status,
        });
        let result = self.call("update_price", Some(params)).await?;

        if result.as_i64() != Some(0) {
            tracing::info!(account, ack = %result, "non-zero acknowledgement for price update");
        }
        Ok(())
    }

    /// Drop a subscription locally, closing its signal channel.
    ///
    /// Returns whether the id was live. The wire protocol has no
    /// unsubscribe method; further notifications for the id are
    /// discarded as unknown.
    pub fn unsubscribe(&self, subscription: u64) -> bool {
        self.inner.router.unsubscribe(subscription)
    }

    /// Current connection generation (1 after the initial dial,
    /// incremented on every successful reconnect).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.conn.generation()
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.dispatcher.pending_count()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.inner.router.subscription_count()
    }

    /// Stop the engine.
    ///
    /// Every still-pending request is released with
    /// [`ClientError::Shutdown`], every subscription channel closes, and
    /// no reconnect follows.
    pub fn close(&self) {
        tracing::info!("shutting down pythd client");
        self.inner.cancel.cancel();
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        if self.inner.cancel.is_cancelled() {
            return Err(ClientError::Shutdown);
        }
        self.inner
            .dispatcher
            .send_and_await(&self.inner.conn, method, params)
            .await
    }
}

impl Drop for PythClient {
    fn drop(&mut self) {
        // best-effort stop for the background read loop
        self.inner.cancel.cancel();
    }
}
