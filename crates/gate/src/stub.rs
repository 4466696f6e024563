use tracing::debug;

use crate::identity::{DocumentRef, GateError, IdentityGate, Verification};

/// Deterministic stand-in for the external platform, used in dev and tests.
///
/// Identifiers carrying the platform's `CX-` prefix verify; anything else is
/// denied. Uploads always succeed and return a reference derived from the
/// filename and payload length.
#[derive(Debug, Default, Clone)]
pub struct StubCargoXGate;

impl StubCargoXGate {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityGate for StubCargoXGate {
    fn validate_exporter_identity(&self, cargox_id: &str) -> Verification {
        let outcome = if cargox_id.trim().starts_with("CX-") {
            Verification::Verified
        } else {
            Verification::Denied
        };
        debug!(cargox_id, ?outcome, "stub gate identity check");
        outcome
    }

    fn upload_document(&self, content: &[u8], filename: &str) -> Result<DocumentRef, GateError> {
        Ok(DocumentRef::new(format!(
            "stub://{}/{}",
            filename,
            content.len()
        )))
    }
}

/// Gate that never answers, for exercising outage paths.
#[derive(Debug, Default, Clone)]
pub struct UnavailableGate;

impl UnavailableGate {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityGate for UnavailableGate {
    fn validate_exporter_identity(&self, _cargox_id: &str) -> Verification {
        Verification::Unavailable
    }

    fn upload_document(&self, _content: &[u8], _filename: &str) -> Result<DocumentRef, GateError> {
        Err(GateError::Unavailable("gate is offline".to_string()))
    }
}
