use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aciport_ingestion::RowError;
use aciport_shipments::{RequestId, RequestStatus};

/// One row of a party's request list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub request_id: RequestId,
    /// `"---"` until a certificate is issued.
    pub certificate_number: String,
    pub importer_name: String,
    pub exporter_name: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
}

/// Committed invoice line, as reported back to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSummary {
    pub hs_code: String,
    pub description: String,
    pub quantity: Decimal,
    pub total_value: Decimal,
}

/// Outcome of an invoice upload.
///
/// Always carries both the committed lines and the rejected rows; a partially
/// bad grid is a success with warnings, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub attached: Vec<LineSummary>,
    pub row_errors: Vec<RowError>,
    pub total_value: Decimal,
}

impl IngestionOutcome {
    pub fn line_count(&self) -> usize {
        self.attached.len()
    }
}

/// Answer of the public certificate validation service. Never an error;
/// negative outcomes are values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateCheck {
    pub valid: bool,
    pub message: String,
    pub importer_name: Option<String>,
    pub exporter_name: Option<String>,
    pub status: Option<RequestStatus>,
}

impl CertificateCheck {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            importer_name: None,
            exporter_name: None,
            status: None,
        }
    }
}
