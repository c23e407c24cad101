//! Shared types for the qbridge ingestion gateway: request/record shapes,
//! the queue and codec seams, and the error type adapters return.

mod error;
mod queue;
mod types;
mod util;

pub use error::{ErrorKind, GatewayError};
pub use queue::{EnvelopeCodec, EnvelopeQueue};
pub use types::{EnrichedRecord, IncomingPayload, Payload, SubmitAccepted};
pub use util::now_ms;
