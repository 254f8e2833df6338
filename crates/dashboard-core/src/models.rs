use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::time_utils::{self, MonthKey};

/// Canonical (normalised) input field names.
pub mod fields {
    pub const ACCOUNT_ID: &str = "account_id";
    pub const ORGANIZATION_NAME: &str = "organization_name";
    pub const PROVIDER_ALIAS: &str = "provider_alias";
    pub const CUSTOMER_TYPE: &str = "customer_type";
    pub const CUSTOMER_CATEGORY: &str = "customer_category";
    pub const ACCOUNT_STATUS: &str = "account_status";
    pub const ACCOUNT_CREATED_DATE: &str = "account_created_date";
    pub const CREDENTIAL_ID: &str = "credential_id";
    pub const PERIOD_BUCKET: &str = "period_bucket";
    pub const CREDENTIAL_COUNT: &str = "credential_count";
}

/// Label used when presenting the missing category.
pub const MISSING_LABEL: &str = "(missing)";

/// Normalise a field name for lookup: trim surrounding whitespace and
/// compare case-insensitively.
pub fn normalize_field_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

// ── RawRecord ─────────────────────────────────────────────────────────────────

/// One untyped source row: field name → cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    /// Build a record from `(name, value)` pairs.
    ///
    /// Names are normalised with [`normalize_field_name`]; when two names
    /// collide after normalisation the first one wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut fields = HashMap::new();
        for (name, value) in pairs {
            fields
                .entry(normalize_field_name(name.as_ref()))
                .or_insert_with(|| value.into());
        }
        Self { fields }
    }

    /// Look up a field by name (whitespace and case are ignored).
    ///
    /// Returns `None` when the field is absent or its cell is empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&normalize_field_name(name))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ── Category ──────────────────────────────────────────────────────────────────

/// A categorical value. Absent or blank input is kept as [`Category::Missing`]
/// instead of being dropped.
///
/// `Missing` orders after every value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Value(String),
    Missing,
}

impl Category {
    /// Interpret a raw cell; `None` and whitespace-only text are missing.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if !s.trim().is_empty() => Category::Value(s.to_string()),
            _ => Category::Missing,
        }
    }

    /// Interpret a user-supplied selection value; an empty string selects
    /// the missing category.
    pub fn from_selection(s: &str) -> Self {
        Self::from_raw(Some(s))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Category::Missing)
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            Category::Value(v) => Some(v),
            Category::Missing => None,
        }
    }

    /// Display label; the missing category renders as [`MISSING_LABEL`].
    pub fn label(&self) -> &str {
        self.as_value().unwrap_or(MISSING_LABEL)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Category::Value(v) => serializer.serialize_str(v),
            Category::Missing => serializer.serialize_none(),
        }
    }
}

// ── CreatedDate ───────────────────────────────────────────────────────────────

/// `account_created_date` after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedDate {
    Parsed(NaiveDateTime),
    /// The original text (possibly empty) did not match `DD-MM-YYYY HH:MM`.
    Unparsed(String),
}

impl CreatedDate {
    pub fn parse(raw: Option<&str>) -> Self {
        let text = raw.unwrap_or_default();
        match time_utils::parse_created_date(text) {
            Some(dt) => CreatedDate::Parsed(dt),
            None => CreatedDate::Unparsed(text.to_string()),
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            CreatedDate::Parsed(dt) => Some(dt),
            CreatedDate::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, CreatedDate::Parsed(_))
    }

    /// Re-render in the input format; unparsed values keep their original text.
    pub fn to_text(&self) -> String {
        match self {
            CreatedDate::Parsed(dt) => dt.format(time_utils::CREATED_DATE_FORMAT).to_string(),
            CreatedDate::Unparsed(text) => text.clone(),
        }
    }
}

// ── Dimension ─────────────────────────────────────────────────────────────────

/// A categorical attribute of a record that can be filtered or grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Organization,
    Provider,
    CustomerType,
    CustomerCategory,
    AccountStatus,
}

impl Dimension {
    /// Dimensions exposed as filter controls.
    pub const FILTERABLE: [Dimension; 4] = [
        Dimension::Organization,
        Dimension::Provider,
        Dimension::CustomerType,
        Dimension::CustomerCategory,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            Dimension::Organization => fields::ORGANIZATION_NAME,
            Dimension::Provider => fields::PROVIDER_ALIAS,
            Dimension::CustomerType => fields::CUSTOMER_TYPE,
            Dimension::CustomerCategory => fields::CUSTOMER_CATEGORY,
            Dimension::AccountStatus => fields::ACCOUNT_STATUS,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

// ── NormalizedRecord ──────────────────────────────────────────────────────────

/// A source row with every field parsed into its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub account_id: Category,
    pub organization_name: Category,
    pub provider_alias: Category,
    pub customer_type: Category,
    pub customer_category: Category,
    pub account_status: Category,
    pub account_created_date: CreatedDate,
    /// Comma-split segments of `credential_id`, in source order, untrimmed.
    pub credential_ids: Vec<String>,
}

impl NormalizedRecord {
    pub fn category(&self, dimension: Dimension) -> &Category {
        match dimension {
            Dimension::Organization => &self.organization_name,
            Dimension::Provider => &self.provider_alias,
            Dimension::CustomerType => &self.customer_type,
            Dimension::CustomerCategory => &self.customer_category,
            Dimension::AccountStatus => &self.account_status,
        }
    }
}

// ── AccountRecord ─────────────────────────────────────────────────────────────

/// A normalised record plus its derived attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub record: NormalizedRecord,
    /// Calendar month of `account_created_date`; `None` when the date did
    /// not parse.
    pub period_bucket: Option<MonthKey>,
    /// Number of entries in `credential_ids`.
    pub credential_count: usize,
}

impl AccountRecord {
    pub fn category(&self, dimension: Dimension) -> &Category {
        self.record.category(dimension)
    }

    pub fn created_at(&self) -> Option<&NaiveDateTime> {
        self.record.account_created_date.as_datetime()
    }

    pub fn has_parsed_date(&self) -> bool {
        self.record.account_created_date.is_parsed()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── RawRecord ─────────────────────────────────────────────────────────────

    #[test]
    fn test_raw_record_trims_and_folds_field_names() {
        let raw = RawRecord::from_pairs([(" Customer_Type ", "Enterprise"), ("account_id", "a1")]);
        assert_eq!(raw.get("customer_type"), Some("Enterprise"));
        assert_eq!(raw.get("ACCOUNT_ID"), Some("a1"));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_raw_record_empty_cell_is_absent() {
        let raw = RawRecord::from_pairs([("credential_id", "")]);
        assert_eq!(raw.get("credential_id"), None);
        assert_eq!(raw.get("unknown_field"), None);
    }

    #[test]
    fn test_raw_record_first_duplicate_wins() {
        let raw = RawRecord::from_pairs([("status", "first"), (" STATUS", "second")]);
        assert_eq!(raw.get("status"), Some("first"));
        assert_eq!(raw.len(), 1);
    }

    // ── Category ──────────────────────────────────────────────────────────────

    #[test]
    fn test_category_from_raw() {
        assert_eq!(Category::from_raw(Some("Acme")), Category::Value("Acme".into()));
        assert_eq!(Category::from_raw(Some("  ")), Category::Missing);
        assert_eq!(Category::from_raw(None), Category::Missing);
    }

    #[test]
    fn test_category_missing_sorts_last() {
        let mut cats = vec![
            Category::Missing,
            Category::Value("b".into()),
            Category::Value("a".into()),
        ];
        cats.sort();
        assert_eq!(
            cats,
            vec![
                Category::Value("a".into()),
                Category::Value("b".into()),
                Category::Missing
            ]
        );
    }

    #[test]
    fn test_category_label_and_serialize() {
        assert_eq!(Category::Missing.label(), MISSING_LABEL);
        assert_eq!(Category::Value("x".into()).to_string(), "x");
        assert_eq!(serde_json::to_string(&Category::Missing).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&Category::Value("x".into())).unwrap(),
            "\"x\""
        );
    }

    #[test]
    fn test_category_from_selection_empty_is_missing() {
        assert!(Category::from_selection("").is_missing());
    }

    // ── CreatedDate ───────────────────────────────────────────────────────────

    #[test]
    fn test_created_date_round_trips_text() {
        let parsed = CreatedDate::parse(Some("05-03-2026 08:15"));
        assert!(parsed.is_parsed());
        assert_eq!(parsed.to_text(), "05-03-2026 08:15");

        let unparsed = CreatedDate::parse(Some("31-02-2026 10:00"));
        assert_eq!(unparsed, CreatedDate::Unparsed("31-02-2026 10:00".into()));
        assert_eq!(unparsed.to_text(), "31-02-2026 10:00");
    }

    #[test]
    fn test_created_date_missing_is_unparsed() {
        assert_eq!(CreatedDate::parse(None), CreatedDate::Unparsed(String::new()));
    }
}
