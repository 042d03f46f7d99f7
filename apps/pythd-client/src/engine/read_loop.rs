//! Read Loop
//!
//! The single active consumer of the stream. One instance drives one
//! connection generation: it reads frames, feeds them through the
//! reassembler, and forwards each decoded message to the dispatcher (by
//! id) or the router (by subscription id). On any transport error or
//! unrecoverable frame it releases every waiter on the dead generation
//! and hands control to the connection manager's redial loop; only an
//! explicit shutdown stops it for good.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::client::ClientInner;
use crate::engine::connection::WsSource;
use crate::engine::dispatcher::FailureReason;
use crate::rpc::message::{RpcResponse, WireMessage};
use crate::rpc::reassembly::{DecodeOutcome, ReassemblyBuffer};

/// Why a generation's read path ended.
enum GenerationEnd {
    /// Transport failure or unrecoverable frame; reconnect.
    ConnectionLost,
    /// Deliberate stop; release waiters with `Shutdown` and exit.
    Shutdown,
}

/// Drive the engine until shutdown, reconnecting across generations.
pub(crate) async fn run(inner: Arc<ClientInner>, mut read: WsSource) {
    loop {
        match drive_generation(&inner, &mut read).await {
            GenerationEnd::Shutdown => break,
            GenerationEnd::ConnectionLost => {}
        }

        // Nothing may keep waiting on the dead generation: fail pending
        // calls fast and force subscribers to resubscribe.
        inner.dispatcher.cancel_all(FailureReason::ConnectionReset);
        inner.router.invalidate_all();

        match inner.conn.reconnect(&inner.cancel).await {
            Some(new_read) => read = new_read,
            None => break,
        }
    }

    inner.dispatcher.cancel_all(FailureReason::Shutdown);
    inner.router.invalidate_all();
    inner.conn.close().await;
    tracing::info!("read loop stopped");
}

/// Read and dispatch messages for the current generation.
async fn drive_generation(inner: &ClientInner, read: &mut WsSource) -> GenerationEnd {
    let mut reassembly = ReassemblyBuffer::new(inner.config.reassembly_capacity);

    loop {
        tokio::select! {
            () = inner.cancel.cancelled() => {
                return GenerationEnd::Shutdown;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !consume(inner, &mut reassembly, text.as_bytes()) {
                        return GenerationEnd::ConnectionLost;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if !consume(inner, &mut reassembly, &data) {
                        return GenerationEnd::ConnectionLost;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    inner.conn.pong(payload).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "server closed the connection");
                    return GenerationEnd::ConnectionLost;
                }
                Some(Ok(_)) => {
                    // Pong and raw frames carry nothing for us
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "websocket read failed");
                    return GenerationEnd::ConnectionLost;
                }
                None => {
                    tracing::info!("websocket stream ended");
                    return GenerationEnd::ConnectionLost;
                }
            }
        }
    }
}

/// Feed one frame into the reassembler and route anything it completes.
///
/// Returns `false` when the generation must end.
fn consume(inner: &ClientInner, reassembly: &mut ReassemblyBuffer, bytes: &[u8]) -> bool {
    match reassembly.feed(bytes) {
        DecodeOutcome::Complete { message, consumed } => {
            tracing::trace!(consumed, "decoded message");
            route(inner, message);
            true
        }
        DecodeOutcome::Incomplete => {
            tracing::trace!(
                buffered = reassembly.len(),
                last_read = bytes.len(),
                "partial message, waiting for more frames"
            );
            true
        }
        DecodeOutcome::Fatal(e) => {
            tracing::warn!(error = %e, "unrecoverable frame, resetting connection");
            false
        }
    }
}

/// Forward a decoded message to whoever is waiting for it.
fn route(inner: &ClientInner, message: WireMessage) {
    match message.id {
        Some(id) => {
            inner.dispatcher.deliver(
                id,
                RpcResponse {
                    id,
                    result: message.result,
                    error: message.error,
                },
            );
        }
        None => {
            if let Some(error) = &message.error {
                tracing::warn!(
                    code = error.code,
                    message = %error.message,
                    "oracle error without a request id"
                );
            }
            match message.subscription() {
                Some(subscription) => inner.router.notify(subscription),
                None => {
                    tracing::debug!(method = ?message.method, "ignoring unroutable message");
                }
            }
        }
    }
}
