//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All projections are rebuildable from the event stream and
//! idempotent under at-least-once delivery.

pub mod parties;
pub mod requests;

use thiserror::Error;

pub use parties::{PartiesProjection, PartyRecord};
pub use requests::{RequestRecord, RequestsProjection};

/// Error applying an envelope to a projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}
