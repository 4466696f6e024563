//! `aciport-ingestion`: tabular invoice-grid parsing.
//!
//! Importers upload invoices as spreadsheets. The pipeline takes a decoded
//! row grid, tolerates bad rows (collecting a positional error for each), and
//! produces the batch of valid [`InvoiceLine`]s for an atomic attach. Only a
//! grid with zero usable rows fails outright.

pub mod grid;

pub use grid::{parse_invoice_grid, IngestionReport, RowError};
