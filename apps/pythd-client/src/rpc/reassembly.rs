//! Frame Reassembly
//!
//! The transport may split one JSON-RPC message across any number of
//! reads. [`ReassemblyBuffer`] accumulates bytes until the whole buffer
//! decodes as a single message, distinguishing two failure classes:
//!
//! - the buffer ends mid-structure — keep the bytes and wait for more
//!   input ([`DecodeOutcome::Incomplete`]);
//! - any other structural error — the stream is garbled and the current
//!   connection generation must be abandoned ([`DecodeOutcome::Fatal`]).
//!
//! A successful decode clears the buffer entirely: the buffer never holds
//! bytes belonging to two distinct messages. Growth is bounded by a fixed
//! capacity ceiling; exceeding it without a complete message is treated
//! as a corrupt or oversized payload rather than a reason to keep
//! buffering.

use crate::rpc::message::WireMessage;

/// Errors that end the current connection generation's read path.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The accumulated message exceeded the capacity ceiling.
    #[error(
        "message exceeds reassembly capacity of {capacity} bytes \
         ({buffered} buffered after a {last_read} byte read)"
    )]
    Oversized {
        /// The configured ceiling.
        capacity: usize,
        /// Bytes that would have been buffered.
        buffered: usize,
        /// Size of the read that tripped the ceiling.
        last_read: usize,
    },

    /// The buffer can no longer extend into a valid message.
    #[error("malformed message with {buffered} bytes buffered (last read {last_read}): {source}")]
    Malformed {
        /// Bytes buffered when decoding failed.
        buffered: usize,
        /// Size of the last read.
        last_read: usize,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result of feeding one transport read into the reassembler.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A complete message was decoded; the buffer is now empty.
    Complete {
        /// The decoded protocol message.
        message: WireMessage,
        /// Bytes consumed to produce it.
        consumed: usize,
    },
    /// The buffer ends mid-structure; feed more bytes.
    Incomplete,
    /// The current generation's read path is over.
    Fatal(FrameError),
}

/// Accumulates raw transport bytes into complete protocol messages.
///
/// Single-owner: driven only by the read loop, so it needs no internal
/// synchronization.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl ReassemblyBuffer {
    /// Create a buffer with the given capacity ceiling.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
        }
    }

    /// Append one read's worth of bytes and try to decode the whole
    /// buffer as a single message.
    pub fn feed(&mut self, bytes: &[u8]) -> DecodeOutcome {
        if self.buf.len() + bytes.len() > self.capacity {
            let buffered = self.buf.len() + bytes.len();
            self.buf.clear();
            return DecodeOutcome::Fatal(FrameError::Oversized {
                capacity: self.capacity,
                buffered,
                last_read: bytes.len(),
            });
        }

        self.buf.extend_from_slice(bytes);

        match serde_json::from_slice::<WireMessage>(&self.buf) {
            Ok(message) => {
                let consumed = self.buf.len();
                self.buf.clear();
                DecodeOutcome::Complete { message, consumed }
            }
            Err(e) if e.is_eof() => DecodeOutcome::Incomplete,
            Err(source) => {
                let buffered = self.buf.len();
                self.buf.clear();
                DecodeOutcome::Fatal(FrameError::Malformed {
                    buffered,
                    last_read: bytes.len(),
                    source,
                })
            }
        }
    }

    /// Bytes currently buffered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RESPONSE: &[u8] = br#"{"jsonrpc":"2.0","id":12,"result":{"subscription":5}}"#;

    fn buffer() -> ReassemblyBuffer {
        ReassemblyBuffer::new(1024)
    }

    #[test]
    fn single_read_decodes_completely() {
        let mut buffer = buffer();
        match buffer.feed(RESPONSE) {
            DecodeOutcome::Complete { message, consumed } => {
                assert_eq!(message.id, Some(12));
                assert_eq!(consumed, RESPONSE.len());
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn split_read_is_incomplete_then_complete() {
        let mut buffer = buffer();
        let (head, tail) = RESPONSE.split_at(20);

        assert!(matches!(buffer.feed(head), DecodeOutcome::Incomplete));
        assert_eq!(buffer.len(), head.len());

        match buffer.feed(tail) {
            DecodeOutcome::Complete { consumed, .. } => assert_eq!(consumed, RESPONSE.len()),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn large_message_in_two_reads_decodes_once() {
        // 1200-byte message delivered as a 1000-byte read then the rest.
        let padding = "x".repeat(1150);
        let message = format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{padding}"}}"#);
        let bytes = message.as_bytes();
        assert!(bytes.len() > 1000);

        let mut buffer = ReassemblyBuffer::new(4096);
        assert!(matches!(buffer.feed(&bytes[..1000]), DecodeOutcome::Incomplete));
        match buffer.feed(&bytes[1000..]) {
            DecodeOutcome::Complete { consumed, .. } => assert_eq!(consumed, bytes.len()),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_fatal() {
        let mut buffer = buffer();
        match buffer.feed(b"not even close to json") {
            DecodeOutcome::Fatal(FrameError::Malformed {
                buffered,
                last_read,
                ..
            }) => {
                assert_eq!(buffered, 22);
                assert_eq!(last_read, 22);
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn concatenated_messages_are_fatal() {
        // The buffer must decode as exactly one message; trailing bytes
        // mean the stream framing is broken.
        let mut buffer = buffer();
        let two = br#"{"jsonrpc":"2.0","id":1,"result":0}{"jsonrpc":"2.0","id":2,"result":0}"#;
        assert!(matches!(buffer.feed(two), DecodeOutcome::Fatal(_)));
    }

    #[test]
    fn oversized_accumulation_is_fatal() {
        let mut buffer = ReassemblyBuffer::new(64);
        assert!(matches!(
            buffer.feed(br#"{"jsonrpc":"2.0","result":""#),
            DecodeOutcome::Incomplete
        ));
        let flood = vec![b'a'; 100];
        match buffer.feed(&flood) {
            DecodeOutcome::Fatal(FrameError::Oversized {
                capacity,
                last_read,
                ..
            }) => {
                assert_eq!(capacity, 64);
                assert_eq!(last_read, 100);
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
    }

    #[test]
    fn buffer_resets_between_messages() {
        let mut buffer = buffer();
        assert!(matches!(
            buffer.feed(RESPONSE),
            DecodeOutcome::Complete { .. }
        ));
        // a second, different message decodes with no carry-over
        match buffer.feed(br#"{"jsonrpc":"2.0","id":13,"result":0}"#) {
            DecodeOutcome::Complete { message, .. } => assert_eq!(message.id, Some(13)),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    proptest! {
        /// A message split into arbitrarily-sized chunks reassembles into
        /// exactly one decoded message, after the final chunk only.
        #[test]
        fn arbitrary_chunking_reassembles_exactly_once(
            mut cuts in prop::collection::vec(1..RESPONSE.len(), 0..6)
        ) {
            cuts.sort_unstable();
            cuts.dedup();

            let mut buffer = ReassemblyBuffer::new(1024);
            let mut completed = 0usize;
            let mut start = 0usize;

            for cut in cuts.iter().chain(std::iter::once(&RESPONSE.len())) {
                let chunk = &RESPONSE[start..*cut];
                start = *cut;
                match buffer.feed(chunk) {
                    DecodeOutcome::Complete { message, consumed } => {
                        completed += 1;
                        prop_assert_eq!(message.id, Some(12));
                        prop_assert_eq!(consumed, RESPONSE.len());
                    }
                    DecodeOutcome::Incomplete => {}
                    DecodeOutcome::Fatal(e) => prop_assert!(false, "unexpected fatal outcome: {}", e),
                }
            }

            prop_assert_eq!(completed, 1);
            prop_assert!(buffer.is_empty());
        }
    }
}
