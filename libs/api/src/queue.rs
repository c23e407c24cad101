use std::future::Future;
use std::pin::Pin;

use crate::{EnrichedRecord, GatewayError};

// ════════════════════════════════════════════════════════════════
//  Queue
// ════════════════════════════════════════════════════════════════

/// Append-only destination for envelopes (Redis list, Redis stream,
/// in-process queue).
///
/// One instance is built at startup and shared by every request handler,
/// so implementations must tolerate concurrent `push` calls.
pub trait EnvelopeQueue: Send + Sync {
    /// Append one envelope to the named queue. A single atomic operation:
    /// either the whole envelope is enqueued or nothing is.
    fn push(&self, queue: &str, envelope: Vec<u8>) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>>;

    /// Check that the backend is reachable.
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>>;

    /// Backend label for logs (e.g. `redis-list redis://127.0.0.1/`).
    fn describe(&self) -> String;
}

// ════════════════════════════════════════════════════════════════
//  Codec
// ════════════════════════════════════════════════════════════════

/// EnrichedRecord ↔ envelope bytes.
///
/// The encoding must be self-describing: a consumer holding only the bytes
/// can recover every field by name.
pub trait EnvelopeCodec: Send + Sync {
    fn encode(&self, record: &EnrichedRecord) -> Result<Vec<u8>, GatewayError>;

    fn decode(&self, envelope: &[u8]) -> Result<EnrichedRecord, GatewayError>;

    /// Short format name for logs.
    fn name(&self) -> &'static str;
}
