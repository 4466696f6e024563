//! `aciport-shipments`: the ACI shipment request lifecycle.
//!
//! A shipment request is opened as a draft by its importer or exporter,
//! collects invoice lines while in draft, and moves through
//! `Draft → Submitted → (DocsUploaded) → Approved`, at which point a
//! certificate number is issued with a six-month validity window. Rejection
//! and cancellation are explicit side branches.

pub mod certificate;
pub mod invoice_line;
pub mod request;

pub use certificate::{CertificateNumber, CERTIFICATE_VALIDITY_MONTHS};
pub use invoice_line::{InvoiceLine, GROSS_WEIGHT_FACTOR};
pub use request::{
    ApproveRequest, AttachLine, AttachLines, CancelRequest, DocsUploadRecorded, DraftOpened,
    LineAttached, OpenDraft, RecordDocsUploaded, RejectRequest, RequestApproved, RequestCancelled,
    RequestId, RequestRejected, RequestStatus, RequestSubmitted, ShipmentRequest, ShipmentRequestCommand,
    ShipmentRequestEvent, SubmitRequest,
};
