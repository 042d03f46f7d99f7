//! Connection Manager
//!
//! Owns the physical websocket. Dials, hands the read half to the read
//! loop, and serializes every outbound frame through a single write lock
//! so concurrent callers cannot interleave partial frames on the wire.
//!
//! On failure the manager redials forever with exponential backoff; each
//! successful dial starts a new connection generation.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::SinkExt;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::config::ReconnectSettings;
use crate::engine::backoff::BackoffPolicy;
use crate::error::ClientError;

/// The websocket stream type produced by dialing.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the websocket.
pub type WsSink = SplitSink<WsStream, Message>;

/// Read half of the websocket.
pub type WsSource = SplitStream<WsStream>;

/// Owns the websocket write half and the reconnect policy.
pub struct ConnectionManager {
    url: String,
    settings: ReconnectSettings,
    /// Write half of the current generation's stream; `None` while
    /// reconnecting, which makes concurrent writes fail fast.
    sink: tokio::sync::Mutex<Option<WsSink>>,
    generation: AtomicU64,
}

impl ConnectionManager {
    /// Create a manager for the given endpoint.
    #[must_use]
    pub fn new(url: String, settings: ReconnectSettings) -> Self {
        Self {
            url,
            settings,
            sink: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Dial the endpoint once, install the write half, and return the
    /// read half for the new generation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dial`] if the websocket handshake fails.
    pub async fn dial(&self) -> Result<WsSource, ClientError> {
        let (stream, _response) =
            tokio_tungstenite::connect_async(&self.url)
                .await
                .map_err(|source| ClientError::Dial {
                    url: self.url.clone(),
                    source,
                })?;

        let (write, read) = stream.split();
        *self.sink.lock().await = Some(write);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(generation, url = %self.url, "connected to pythd");

        Ok(read)
    }

    /// Redial until a new stream is established or shutdown is requested.
    ///
    /// Retries forever with exponential backoff (1s initial, doubling,
    /// 60s cap by default). Returns `None` only when `cancel` fires.
    /// The caller must have released all waiters on the dead generation
    /// before invoking this.
    pub async fn reconnect(&self, cancel: &CancellationToken) -> Option<WsSource> {
        // drop the dead write half so writes fail fast while we redial
        self.sink.lock().await.take();

        let mut backoff = BackoffPolicy::new(self.settings.clone());
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            match self.dial().await {
                Ok(read) => return Some(read),
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt = backoff.attempt_count(),
                        delay_ms = delay.as_millis(),
                        "redial failed"
                    );

                    tokio::select! {
                        () = cancel.cancelled() => return None,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Write one full framed message to the current stream.
    ///
    /// Concurrent writers are serialized by the write lock.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] while reconnecting, or the
    /// transport error if the send fails.
    pub async fn write(&self, text: String) -> Result<(), ClientError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(ClientError::NotConnected)?;
        sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Answer a server ping through the serialized write path.
    ///
    /// Best-effort: a failed pong means the transport is going down,
    /// which the read side will observe on its own.
    pub async fn pong(&self, payload: Bytes) {
        let mut guard = self.sink.lock().await;
        if let Some(sink) = guard.as_mut()
            && let Err(e) = sink.send(Message::Pong(payload)).await
        {
            tracing::debug!(error = %e, "failed to answer ping");
        }
    }

    /// Current connection generation (0 before the first dial).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Send a close frame and drop the write half.
    pub async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_without_connection_fails_fast() {
        let conn = ConnectionManager::new(
            "ws://127.0.0.1:1".to_string(),
            ReconnectSettings::default(),
        );
        let result = conn.write("{}".to_string()).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn dial_failure_reports_the_endpoint() {
        // port 1 is never listening
        let conn = ConnectionManager::new(
            "ws://127.0.0.1:1".to_string(),
            ReconnectSettings::default(),
        );
        match conn.dial().await {
            Err(ClientError::Dial { url, .. }) => assert_eq!(url, "ws://127.0.0.1:1"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("dial unexpectedly succeeded"),
        }
        assert_eq!(conn.generation(), 0);
    }

    #[tokio::test]
    async fn reconnect_stops_on_shutdown() {
        let conn = ConnectionManager::new(
            "ws://127.0.0.1:1".to_string(),
            ReconnectSettings::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(conn.reconnect(&cancel).await.is_none());
    }
}
