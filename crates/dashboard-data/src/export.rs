//! Delimited-text export of filtered records.

use std::io::Write;
use std::path::Path;

use dashboard_core::error::Result;
use dashboard_core::models::{fields, AccountRecord};
use tracing::debug;

/// Header row of the export, in column order.
pub const EXPORT_HEADER: [&str; 10] = [
    fields::ACCOUNT_ID,
    fields::ORGANIZATION_NAME,
    fields::PROVIDER_ALIAS,
    fields::CUSTOMER_TYPE,
    fields::CUSTOMER_CATEGORY,
    fields::ACCOUNT_STATUS,
    fields::ACCOUNT_CREATED_DATE,
    fields::CREDENTIAL_ID,
    fields::PERIOD_BUCKET,
    fields::CREDENTIAL_COUNT,
];

/// Write `records` as CSV with a header row to `writer`.
pub fn write_records<W: Write>(writer: W, records: &[&AccountRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;
    for record in records {
        wtr.write_record(export_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `records` to a CSV file at `path`, replacing any existing file.
pub fn export_records(path: &Path, records: &[&AccountRecord]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_records(file, records)?;
    debug!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

fn export_row(record: &AccountRecord) -> [String; 10] {
    let r = &record.record;
    let cell = |c: &dashboard_core::models::Category| c.as_value().unwrap_or_default().to_string();
    [
        cell(&r.account_id),
        cell(&r.organization_name),
        cell(&r.provider_alias),
        cell(&r.customer_type),
        cell(&r.customer_category),
        cell(&r.account_status),
        r.account_created_date.to_text(),
        r.credential_ids.join(","),
        record
            .period_bucket
            .map(|p| p.to_string())
            .unwrap_or_default(),
        record.credential_count.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::derive_attributes;
    use crate::normalizer::normalize_record;
    use crate::reader::read_raw_records;
    use dashboard_core::models::RawRecord;
    use tempfile::TempDir;

    fn make(pairs: &[(&str, &str)]) -> AccountRecord {
        derive_attributes(normalize_record(&RawRecord::from_pairs(pairs.iter().copied())))
    }

    #[test]
    fn test_write_records_header_and_rows() {
        let record = make(&[
            ("account_id", "a1"),
            ("organization_name", "Acme, Inc."),
            ("account_created_date", "05-03-2026 08:15"),
            ("credential_id", "x,,y"),
        ]);
        let mut out = Vec::new();
        write_records(&mut out, &[&record]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), EXPORT_HEADER.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "a1,\"Acme, Inc.\",,,,,05-03-2026 08:15,\"x,,y\",2026-03,3"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_write_records_unparsed_date_keeps_text() {
        let record = make(&[("account_id", "a1"), ("account_created_date", "31-02-2026 10:00")]);
        let mut out = Vec::new();
        write_records(&mut out, &[&record]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("31-02-2026 10:00,,,0"));
    }

    #[test]
    fn test_write_records_empty_has_header_only() {
        let mut out = Vec::new();
        write_records(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_export_can_be_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filtered.csv");
        let record = make(&[("account_id", "a1"), ("customer_type", "SMB")]);
        export_records(&path, &[&record]).unwrap();

        let rows = read_raw_records(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("customer_type"), Some("SMB"));
        assert_eq!(rows[0].get("credential_count"), Some("0"));
    }
}
