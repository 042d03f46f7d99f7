#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms
    )
)]

//! Pythd Client - Price Oracle Connection Engine
//!
//! A websocket client for the pythd price-oracle RPC API. The daemon
//! speaks JSON-RPC 2.0 over one persistent duplex stream; this crate
//! owns that stream and multiplexes it:
//!
//! - **Frame reassembly**: a protocol message may span any number of
//!   transport frames; bytes accumulate until exactly one message
//!   decodes ([`rpc::reassembly`]).
//! - **Request correlation**: any number of tasks issue calls
//!   concurrently; monotonic ids match each response to its caller
//!   ([`engine::dispatcher`]).
//! - **Notification routing**: unsolicited price-schedule signals are
//!   routed to the matching subscriber's bounded channel without ever
//!   blocking the read path ([`engine::router`]).
//! - **Reconnection**: transport failures release every in-flight call
//!   and subscription, then the engine redials forever with exponential
//!   backoff ([`engine::connection`]).
//!
//! # Data Flow
//!
//! ```text
//! caller ──► dispatcher ──► connection ──► wire
//!                ▲                           │
//!                │ deliver(id)               ▼
//!              read loop ◄── reassembler ◄── frames
//!                │ notify(subscription)
//!                ▼
//!             router ──► subscriber channels
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pythd_client::{ClientConfig, PriceStatus, PythClient};
//!
//! # async fn example() -> Result<(), pythd_client::ClientError> {
//! let client = PythClient::connect(ClientConfig::new("ws://127.0.0.1:8910")).await?;
//!
//! let products = client.get_product_list().await?;
//! let account = &products[0].price[0].account;
//!
//! let mut subscription = client.subscribe_price_sched(account).await?;
//! while subscription.signals.recv().await.is_some() {
//!     client
//!         .update_price(account, 42_000_000, 125_000, PriceStatus::Trading)
//!         .await?;
//! }
//! // channel closed: connection was reset, resubscribe
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Public client surface.
pub mod client;

/// Configuration types.
pub mod config;

/// The connection-multiplexing engine.
pub mod engine;

/// Error types.
pub mod error;

/// Typed oracle records.
pub mod product;

/// JSON-RPC wire layer.
pub mod rpc;

/// Tracing setup for binaries.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{PriceSchedSubscription, PythClient};
pub use config::{ClientConfig, ConfigError, ReconnectSettings};
pub use engine::backoff::BackoffPolicy;
pub use engine::dispatcher::{IdSequence, RequestDispatcher};
pub use engine::router::{SignalReceiver, SubscriptionRouter};
pub use error::ClientError;
pub use product::{
    PriceAccount, PriceAccountSummary, PriceStatus, Product, ProductAttributes, ProductSummary,
    PublisherAccount,
};
pub use rpc::message::{RpcError, RpcRequest, SubscriptionParams, WireMessage};
pub use rpc::reassembly::{DecodeOutcome, FrameError, ReassemblyBuffer};
