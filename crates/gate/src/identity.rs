use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of an exporter identity check.
///
/// `Denied` is an authoritative answer from the gate; `Unavailable` means the
/// gate could not answer at all. Transport failures must fold to
/// `Unavailable`, never to `Denied`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Verified,
    Denied,
    Unavailable,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

/// Opaque reference to a document stored on the external platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from gate operations that have no three-way outcome (uploads).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("gate rejected the document: {0}")]
    Rejected(String),

    #[error("gate unavailable: {0}")]
    Unavailable(String),
}

/// External identity gate.
///
/// Implementations wrap a blocking call to the external platform. The
/// identity check never returns an error type; every failure mode is folded
/// into the [`Verification`] outcome.
pub trait IdentityGate: Send + Sync {
    /// Check whether the given platform identifier belongs to a registered,
    /// verified exporter.
    fn validate_exporter_identity(&self, cargox_id: &str) -> Verification;

    /// Push a document to the external platform, returning its reference.
    fn upload_document(&self, content: &[u8], filename: &str) -> Result<DocumentRef, GateError>;
}
