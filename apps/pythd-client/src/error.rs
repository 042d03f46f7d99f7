//! Client Error Types
//!
//! One error enum covers the whole engine surface. The taxonomy separates
//! failures that belong to a single call (RPC errors, decode failures, id
//! mismatches) from failures that belong to the connection as a whole
//! (reset, shutdown), which are fanned out to every live waiter when the
//! generation ends.

use tokio_tungstenite::tungstenite;

/// Errors surfaced by the pythd client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The initial dial or a redial attempt failed.
    #[error("failed to dial {url}: {source}")]
    Dial {
        /// The websocket endpoint that was dialed.
        url: String,
        /// The underlying websocket error.
        #[source]
        source: tungstenite::Error,
    },

    /// No connection is currently established (reconnect in progress).
    #[error("not connected to pythd (reconnect in progress)")]
    NotConnected,

    /// WebSocket transport error while writing.
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// The oracle returned a structured JSON-RPC error for this request.
    #[error("pythd returned error {code}: {message}")]
    Rpc {
        /// Server-assigned error code.
        code: i64,
        /// Server-provided error message.
        message: String,
    },

    /// A delivered response carried an id that does not match the request.
    ///
    /// This indicates a dispatch bug rather than a server fault; it is
    /// surfaced to the one affected caller and does not tear down the
    /// connection.
    #[error("response id {actual} does not match request id {expected}")]
    ProtocolViolation {
        /// The id the caller was waiting for.
        expected: u64,
        /// The id the delivered response carried.
        actual: u64,
    },

    /// A request id was registered twice.
    #[error("request id {0} is already registered")]
    DuplicateId(u64),

    /// The connection was reset while the request or subscription was live.
    #[error("connection reset while the request was in flight")]
    ConnectionReset,

    /// The client was deliberately stopped; no reconnect will follow.
    #[error("client shut down")]
    Shutdown,

    /// Failed to serialize an outbound request.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// A response arrived but its result payload did not match the
    /// expected record shape.
    #[error("failed to decode result payload: {0}")]
    Decode(#[source] serde_json::Error),
}
