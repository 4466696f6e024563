//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures. Infrastructure
/// concerns (storage, transport) live in their own error types. The variants
/// are deliberately distinct so callers can surface "not permitted" apart from
/// "bad input" apart from "retry later".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Registration identity rules violated (blank name, missing role identifier).
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Role identifier or email collides with an already-registered party.
    #[error("duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// The caller's role may not originate this operation.
    #[error("role not permitted: {0}")]
    UnauthorizedRole(String),

    /// The caller is not a party to the request it is trying to mutate.
    #[error("forbidden")]
    Forbidden,

    /// The external gate denied the counterparty's identifier. Authoritative,
    /// not an outage signal; retrying will not help.
    #[error("counterparty not verified: {0}")]
    UnverifiedCounterparty(String),

    /// The external gate could not answer (timeout, transport failure).
    /// Distinct from a denial; callers may retry.
    #[error("counterparty verification unavailable: {0}")]
    CounterpartyUnavailable(String),

    /// Operation attempted in the wrong lifecycle phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A shipment request cannot be submitted without invoice lines.
    #[error("cannot submit an empty shipment")]
    EmptyShipment,

    /// A tabular upload produced zero valid invoice lines.
    #[error("invoice ingestion failed: {0}")]
    IngestionFailed(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (stream/aggregate mismatch and the like).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / concurrent modification).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_identity(msg: impl Into<String>) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    pub fn duplicate_identity(msg: impl Into<String>) -> Self {
        Self::DuplicateIdentity(msg.into())
    }

    pub fn unauthorized_role(msg: impl Into<String>) -> Self {
        Self::UnauthorizedRole(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
