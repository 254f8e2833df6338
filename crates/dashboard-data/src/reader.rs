//! CSV loading for the account dashboard.
//!
//! Reads a header-plus-rows export into [`RawRecord`]s. Cells are kept as
//! text; typing happens in the normaliser.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::RawRecord;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load every row of the CSV file at `path`.
pub fn load_raw_records(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_raw_records(file)?;
    debug!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read CSV text with a header row from any reader.
///
/// Rows shorter than the header simply lack the trailing fields; extra cells
/// beyond the header are ignored. Bytes that are not valid UTF-8 are replaced
/// with U+FFFD, so every data row yields a record.
pub fn read_raw_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut records = Vec::new();
    let mut rows_repaired = 0u64;
    let mut row = ByteRecord::new();

    while rdr.read_byte_record(&mut row)? {
        let mut repaired = false;
        let cells = row.iter().map(|cell| {
            let text = String::from_utf8_lossy(cell);
            repaired |= matches!(text, Cow::Owned(_));
            text
        });
        let record = RawRecord::from_pairs(headers.iter().zip(cells));
        if repaired {
            let line = row.position().map_or(0, |p| p.line());
            warn!("Row at line {} is not valid UTF-8; invalid bytes replaced", line);
            rows_repaired += 1;
        }
        records.push(record);
    }

    debug!("{} rows read, {} with replaced bytes", records.len(), rows_repaired);
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
