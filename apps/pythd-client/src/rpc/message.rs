//! JSON-RPC 2.0 Message Types
//!
//! Wire format types for the pythd RPC protocol. Outbound requests always
//! carry an engine-assigned integer id; inbound traffic is either a
//! response (has an id) or an unsolicited subscription notification
//! (no id, carries a subscription id in its params).
//!
//! # Wire Format (JSON)
//!
//! Request:
//! ```json
//! {"jsonrpc":"2.0","id":3,"method":"subscribe_price_sched","params":{"account":"HVGyZ..."}}
//! ```
//!
//! Response:
//! ```json
//! {"jsonrpc":"2.0","id":3,"result":{"subscription":77}}
//! ```
//!
//! Notification:
//! ```json
//! {"jsonrpc":"2.0","method":"notify_price_sched","params":{"subscription":77}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version sent on every request.
const JSONRPC_VERSION: &str = "2.0";

/// An outbound JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Protocol version (always "2.0").
    pub jsonrpc: &'static str,
    /// Engine-assigned request id.
    pub id: u64,
    /// Method name.
    pub method: String,
    /// Method parameters, omitted when the method takes none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Create a request for the given id and method.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A structured JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Server-assigned error code.
    pub code: i64,
    /// Server-provided error message.
    pub message: String,
    /// Optional additional context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The params payload of a subscription reply or notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionParams {
    /// Server-assigned subscription id.
    pub subscription: u64,
}

/// Any single inbound protocol message, before routing.
///
/// Every field is optional at the serde level; classification happens
/// after decoding: a message with an id is a response, a message without
/// one is (at best) a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    /// Protocol version, if the server sent one.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request id this message responds to; absent on notifications.
    #[serde(default)]
    pub id: Option<u64>,
    /// Method name; present on notifications.
    #[serde(default)]
    pub method: Option<String>,
    /// Notification parameters.
    #[serde(default)]
    pub params: Option<Value>,
    /// Successful result payload.
    #[serde(default)]
    pub result: Option<Value>,
    /// Structured error payload.
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl WireMessage {
    /// Whether this message is a response to a request.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        self.id.is_some()
    }

    /// Extract the subscription id if this is a subscription notification.
    #[must_use]
    pub fn subscription(&self) -> Option<u64> {
        let params = self.params.as_ref()?;
        serde_json::from_value::<SubscriptionParams>(params.clone())
            .ok()
            .map(|p| p.subscription)
    }
}

/// A decoded response ready for delivery to its waiter.
#[derive(Debug, Clone)]
pub struct RpcResponse {
    /// The request id this response answers.
    pub id: u64,
    /// Successful result payload.
    pub result: Option<Value>,
    /// Structured error payload.
    pub error: Option<RpcError>,
}
