//! Tabular grid decoding.
//!
//! Invoice uploads arrive as spreadsheet exports. This adapter decodes CSV
//! bytes into the row grid the ingestion pipeline consumes; the pipeline
//! itself stays transport-agnostic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),
}

/// Decode CSV bytes to a row grid, header row included.
///
/// Rows may have ragged lengths; the ingestion pipeline treats missing
/// trailing cells as blank.
pub fn decode_csv_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, TabularError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rows_including_header() {
        let bytes = b"HS Code,Description,Quantity\n851713,Phones,10\n";
        let grid = decode_csv_grid(bytes).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0][0], "HS Code");
        assert_eq!(grid[1], vec!["851713", "Phones", "10"]);
    }

    #[test]
    fn tolerates_ragged_rows() {
        let bytes = b"HS Code,Description,Quantity,Price,Weight\n851713,Phones,10\n";
        let grid = decode_csv_grid(bytes).unwrap();
        assert_eq!(grid[1].len(), 3);
    }

    #[test]
    fn empty_input_decodes_to_no_rows() {
        assert!(decode_csv_grid(b"").unwrap().is_empty());
    }
}
