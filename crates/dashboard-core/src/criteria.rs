//! Filter criteria and pipeline configuration.
//!
//! Values here arrive already resolved from whatever control surface the
//! caller uses; [`FilterCriteria::validate`] rejects out-of-domain values
//! before any filtering or aggregation runs.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::models::{Category, Dimension};

/// Default number of entries in the top-N ranking.
pub const DEFAULT_TOP_N: usize = 10;

// ── Metric ────────────────────────────────────────────────────────────────────

/// The value measured by rankings and growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Number of distinct `account_id` values.
    #[default]
    Accounts,
    /// Sum of `credential_count`.
    Credentials,
}

impl FromStr for Metric {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accounts" => Ok(Metric::Accounts),
            "credentials" => Ok(Metric::Credentials),
            other => Err(DashboardError::Config(format!("unknown metric \"{}\"", other))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Accounts => f.write_str("accounts"),
            Metric::Credentials => f.write_str("credentials"),
        }
    }
}

// ── DimensionFilter ───────────────────────────────────────────────────────────

/// Inclusion filter over one categorical dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DimensionFilter {
    /// "Select all": no filtering on this dimension.
    #[default]
    All,
    /// Only records whose value is in the set pass.
    Only(BTreeSet<Category>),
}

impl DimensionFilter {
    pub fn only<I: IntoIterator<Item = Category>>(values: I) -> Self {
        DimensionFilter::Only(values.into_iter().collect())
    }

    /// Convenience for selections given as plain strings (`""` = missing).
    pub fn from_selection<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::only(values.into_iter().map(|v| Category::from_selection(v.as_ref())))
    }
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive date range; an absent bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        self.from.map_or(true, |from| *ts >= from) && self.to.map_or(true, |to| *ts <= to)
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}

// ── FilterCriteria ────────────────────────────────────────────────────────────

/// The combined selections applied before aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub organizations: DimensionFilter,
    pub providers: DimensionFilter,
    pub customer_types: DimensionFilter,
    pub customer_categories: DimensionFilter,
    /// `None` means the date-range filter is not active at all, so records
    /// with unparsed dates are not judged by it.
    pub date_range: Option<DateRange>,
    pub selected_metric: Metric,
    pub top_n: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            organizations: DimensionFilter::All,
            providers: DimensionFilter::All,
            customer_types: DimensionFilter::All,
            customer_categories: DimensionFilter::All,
            date_range: None,
            selected_metric: Metric::Accounts,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl FilterCriteria {
    /// Set `top_n` from a signed user value, rejecting `<= 0`.
    pub fn with_top_n(mut self, top_n: i64) -> Result<Self> {
        if top_n <= 0 {
            return Err(DashboardError::InvalidCriteria(format!(
                "top_n must be a positive integer, got {}",
                top_n
            )));
        }
        self.top_n = usize::try_from(top_n)
            .map_err(|_| DashboardError::InvalidCriteria(format!("top_n {} is too large", top_n)))?;
        Ok(self)
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.selected_metric = metric;
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension, filter: DimensionFilter) -> Self {
        match dimension {
            Dimension::Organization => self.organizations = filter,
            Dimension::Provider => self.providers = filter,
            Dimension::CustomerType => self.customer_types = filter,
            Dimension::CustomerCategory => self.customer_categories = filter,
            // Account status is grouped on, never filtered.
            Dimension::AccountStatus => {}
        }
        self
    }

    /// The filter for `dimension`; dimensions without a control are `All`.
    pub fn dimension_filter(&self, dimension: Dimension) -> &DimensionFilter {
        const ALL: &DimensionFilter = &DimensionFilter::All;
        match dimension {
            Dimension::Organization => &self.organizations,
            Dimension::Provider => &self.providers,
            Dimension::CustomerType => &self.customer_types,
            Dimension::CustomerCategory => &self.customer_categories,
            Dimension::AccountStatus => ALL,
        }
    }

    /// Reject out-of-domain criteria.
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(DashboardError::InvalidCriteria(
                "top_n must be a positive integer, got 0".to_string(),
            ));
        }
        if let Some(range) = &self.date_range {
            if range.is_inverted() {
                return Err(DashboardError::InvalidCriteria(format!(
                    "date range is inverted: from {} is after to {}",
                    range.from.map(|d| d.to_string()).unwrap_or_default(),
                    range.to.map(|d| d.to_string()).unwrap_or_default(),
                )));
            }
        }
        Ok(())
    }
}

// ── PipelineConfig ────────────────────────────────────────────────────────────

/// How records whose creation date failed to parse are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedDatePolicy {
    /// Keep them for dimension-based aggregates; exclude them only from
    /// time-based ones.
    #[default]
    KeepForDimensions,
    /// Drop them before filtering and aggregation.
    DropEverywhere,
}

impl FromStr for UnparsedDatePolicy {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(UnparsedDatePolicy::KeepForDimensions),
            "drop" => Ok(UnparsedDatePolicy::DropEverywhere),
            other => Err(DashboardError::Config(format!(
                "unknown unparsed-date policy \"{}\"",
                other
            ))),
        }
    }
}

/// Ordering among ranking entries with equal metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep first-appearance order in the filtered sequence.
    #[default]
    FirstSeen,
    /// Order ties by category label.
    Alphabetical,
}

impl FromStr for TieBreak {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-seen" | "first_seen" => Ok(TieBreak::FirstSeen),
            "alphabetical" => Ok(TieBreak::Alphabetical),
            other => Err(DashboardError::Config(format!("unknown tie-break \"{}\"", other))),
        }
    }
}

/// Per-snapshot pipeline switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    pub unparsed_dates: UnparsedDatePolicy,
    pub tie_break: TieBreak,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
