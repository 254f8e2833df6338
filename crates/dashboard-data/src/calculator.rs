//! Derived attributes: period bucket and credential count.

use dashboard_core::models::{AccountRecord, NormalizedRecord};
use dashboard_core::time_utils::MonthKey;

/// Attach derived attributes to one normalised record.
///
/// The period bucket is the sortable [`MonthKey`]; records whose date did not
/// parse get no bucket.
pub fn derive_attributes(record: NormalizedRecord) -> AccountRecord {
    let period_bucket = record
        .account_created_date
        .as_datetime()
        .map(MonthKey::from_datetime);
    let credential_count = record.credential_ids.len();

    AccountRecord {
        record,
        period_bucket,
        credential_count,
    }
}

pub fn derive_all(records: Vec<NormalizedRecord>) -> Vec<AccountRecord> {
    records.into_iter().map(derive_attributes).collect()
}
