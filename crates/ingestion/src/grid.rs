use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use aciport_core::{DomainError, DomainResult};
use aciport_shipments::InvoiceLine;

/// Expected column order of an invoice grid.
const COL_HS_CODE: usize = 0;
const COL_DESCRIPTION: usize = 1;
const COL_QUANTITY: usize = 2;
const COL_UNIT_PRICE: usize = 3;
const COL_NET_WEIGHT: usize = 4;

/// A per-row ingestion failure, positioned by its 1-based grid row number
/// (the header is row 1, so the first data row is row 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl RowError {
    fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl core::fmt::Display for RowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Result of parsing an invoice grid: the valid lines in row order, plus one
/// error per rejected row. At least one line is always present; a grid with
/// no usable rows is an [`DomainError::IngestionFailed`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub lines: Vec<InvoiceLine>,
    pub row_errors: Vec<RowError>,
}

impl IngestionReport {
    pub fn total_value(&self) -> Decimal {
        self.lines.iter().map(InvoiceLine::total_value).sum()
    }
}

fn cell<'a>(row: &'a [String], index: usize) -> &'a str {
    row.get(index).map(String::as_str).unwrap_or("").trim()
}

fn parse_optional_decimal(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap_or(Decimal::ZERO)
}

/// Parse a decoded invoice grid into invoice lines.
///
/// Row 0 is a header and is always skipped. Rows whose HS code and quantity
/// cells are both blank are skipped silently. Every other malformed row
/// produces a [`RowError`]; only a grid yielding zero valid lines fails.
pub fn parse_invoice_grid(rows: &[Vec<String>]) -> DomainResult<IngestionReport> {
    if rows.len() < 2 {
        return Err(DomainError::IngestionFailed(
            "grid must have a header row and at least one data row".to_string(),
        ));
    }

    let mut lines = Vec::new();
    let mut row_errors = Vec::new();

    for (index, row) in rows.iter().enumerate().skip(1) {
        let row_number = index + 1;

        let hs_code = cell(row, COL_HS_CODE);
        let description = cell(row, COL_DESCRIPTION);
        let qty_text = cell(row, COL_QUANTITY);

        if hs_code.is_empty() && qty_text.is_empty() {
            continue;
        }

        if hs_code.is_empty() {
            row_errors.push(RowError::new(row_number, "HS code is required"));
            continue;
        }

        if hs_code.len() < 4 {
            row_errors.push(RowError::new(
                row_number,
                format!(
                    "HS code '{}' must be at least 4 characters (length: {})",
                    hs_code,
                    hs_code.len()
                ),
            ));
            continue;
        }

        if qty_text.is_empty() {
            row_errors.push(RowError::new(row_number, "quantity is required"));
            continue;
        }

        let quantity = match Decimal::from_str(qty_text) {
            Ok(qty) if qty > Decimal::ZERO => qty,
            _ => {
                row_errors.push(RowError::new(
                    row_number,
                    format!("quantity must be a positive number (found: '{qty_text}')"),
                ));
                continue;
            }
        };

        let unit_price = parse_optional_decimal(cell(row, COL_UNIT_PRICE));
        let net_weight = parse_optional_decimal(cell(row, COL_NET_WEIGHT));

        match InvoiceLine::new(hs_code, description, quantity, unit_price, net_weight) {
            Ok(line) => lines.push(line),
            Err(err) => row_errors.push(RowError::new(row_number, err.to_string())),
        }
    }

    if lines.is_empty() {
        let summary = if row_errors.is_empty() {
            "no valid rows found; expected columns: HS code, description, \
             quantity, unit price, net weight"
                .to_string()
        } else {
            summarize_errors(&row_errors, 5)
        };
        return Err(DomainError::IngestionFailed(summary));
    }

    if !row_errors.is_empty() {
        warn!(
            accepted = lines.len(),
            rejected = row_errors.len(),
            "invoice grid parsed with row errors"
        );
    }

    Ok(IngestionReport { lines, row_errors })
}

fn summarize_errors(errors: &[RowError], limit: usize) -> String {
    let mut summary = errors
        .iter()
        .take(limit)
        .map(RowError::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    if errors.len() > limit {
        summary.push_str(&format!(" ... and {} more errors", errors.len() - limit));
    }
    summary
}
