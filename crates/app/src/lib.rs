//! `aciport-app`: application services for the ACI intake platform.
//!
//! Wires the command dispatcher, projections, and the external identity gate
//! into the caller-facing operations: party registration and search, the
//! shipment request lifecycle, invoice ingestion, and public certificate
//! validation. Every call that acts on behalf of someone takes an explicit
//! [`Actor`]; there is no ambient identity.

pub mod actor;
pub mod services;
pub mod views;

pub use actor::Actor;
pub use services::AppServices;
pub use views::{CertificateCheck, IngestionOutcome, LineSummary, RequestSummary};
