//! Raw → typed record conversion.
//!
//! Pure and total: every [`RawRecord`] yields exactly one
//! [`NormalizedRecord`]. Bad dates become [`CreatedDate::Unparsed`] and blank
//! categorical cells become [`Category::Missing`].

use dashboard_core::models::{fields, Category, CreatedDate, NormalizedRecord, RawRecord};
use tracing::debug;

/// Normalise a batch, preserving length and order.
pub fn normalize_records(raw: &[RawRecord]) -> Vec<NormalizedRecord> {
    let records: Vec<NormalizedRecord> = raw.iter().map(normalize_record).collect();

    let unparsed = records
        .iter()
        .filter(|r| !r.account_created_date.is_parsed())
        .count();
    debug!(
        "Normalised {} records ({} with unparsed creation dates)",
        records.len(),
        unparsed
    );

    records
}

/// Normalise a single row.
pub fn normalize_record(raw: &RawRecord) -> NormalizedRecord {
    let category = |name: &str| Category::from_raw(raw.get(name));

    NormalizedRecord {
        account_id: category(fields::ACCOUNT_ID),
        organization_name: category(fields::ORGANIZATION_NAME),
        provider_alias: category(fields::PROVIDER_ALIAS),
        customer_type: category(fields::CUSTOMER_TYPE),
        customer_category: category(fields::CUSTOMER_CATEGORY),
        account_status: category(fields::ACCOUNT_STATUS),
        account_created_date: CreatedDate::parse(raw.get(fields::ACCOUNT_CREATED_DATE)),
        credential_ids: split_credentials(raw.get(fields::CREDENTIAL_ID)),
    }
}

/// Split a comma-delimited `credential_id` cell.
///
/// Segments are neither trimmed nor deduplicated, and empty segments between
/// consecutive commas count. A missing cell yields no credentials.
pub fn split_credentials(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(s) => s.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
