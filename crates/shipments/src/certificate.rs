use serde::{Deserialize, Serialize};

use aciport_core::ValueObject;

use crate::request::RequestId;

/// Regulatory validity window for an issued certificate.
pub const CERTIFICATE_VALIDITY_MONTHS: u32 = 6;

/// An issued certificate number: `{4-digit year}-EG-{request id zero-padded
/// to 12 digits}`, assembled at approval time from the UTC year and the
/// request's numeric identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateNumber(String);

impl CertificateNumber {
    /// Assemble the certificate number for a request approved in `year`.
    pub fn issue(year: i32, request_id: RequestId) -> Self {
        Self(format!("{year:04}-EG-{:012}", request_id.value()))
    }

    /// Wrap a caller-supplied certificate number without re-deriving it.
    /// Used by lookups, where the string is the search key.
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for CertificateNumber {}
