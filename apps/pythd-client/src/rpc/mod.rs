//! JSON-RPC Wire Layer
//!
//! Wire-format types and the frame reassembler that turns transport reads
//! into complete protocol messages.

pub mod message;
pub mod reassembly;
