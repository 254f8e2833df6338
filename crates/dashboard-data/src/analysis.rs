//! Pipeline entry point for the account dashboard.
//!
//! A [`Snapshot`] owns the normalised, derived record set of one load. Each
//! call to [`Snapshot::run`] validates criteria, filters, and aggregates into
//! a fresh [`DashboardView`]; nothing is cached between runs.

use std::path::Path;

use chrono::Utc;
use dashboard_core::criteria::{FilterCriteria, PipelineConfig, UnparsedDatePolicy};
use dashboard_core::error::Result;
use dashboard_core::models::{AccountRecord, Category, Dimension, RawRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::{AccountAggregator, AggregateResult};
use crate::calculator::derive_all;
use crate::filter::FilterEngine;
use crate::normalizer::normalize_records;
use crate::reader::load_raw_records;

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside a loaded snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMetadata {
    /// ISO-8601 timestamp when this snapshot was built.
    pub loaded_at: String,
    /// Number of source rows normalised.
    pub records_loaded: usize,
    /// Rows whose creation date did not parse.
    pub unparsed_dates: usize,
    /// Rows removed by [`UnparsedDatePolicy::DropEverywhere`].
    pub dropped_by_policy: usize,
}

/// Selectable values of every filter dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub organizations: Vec<Category>,
    pub providers: Vec<Category>,
    pub customer_types: Vec<Category>,
    pub customer_categories: Vec<Category>,
}

/// Output of one pipeline pass.
#[derive(Debug, Clone)]
pub struct DashboardView<'a> {
    /// Filtered records in source order.
    pub records: Vec<&'a AccountRecord>,
    pub aggregates: AggregateResult,
}

/// One fully materialised, immutable record set.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Vec<AccountRecord>,
    config: PipelineConfig,
    filter: FilterEngine,
    metadata: SnapshotMetadata,
}

impl Snapshot {
    /// Load a CSV file and build a snapshot from it.
    pub fn load(path: &Path, config: PipelineConfig) -> Result<Self> {
        let raw = load_raw_records(path)?;
        Ok(Self::from_raw(&raw, config))
    }

    /// Normalise, derive and apply the unparsed-date policy.
    pub fn from_raw(raw: &[RawRecord], config: PipelineConfig) -> Self {
        let mut records = derive_all(normalize_records(raw));
        let records_loaded = records.len();
        let unparsed_dates = records.iter().filter(|r| !r.has_parsed_date()).count();

        if unparsed_dates > 0 {
            warn!(
                "{} of {} records have an unparsable account_created_date",
                unparsed_dates, records_loaded
            );
        }

        let mut dropped_by_policy = 0;
        if config.unparsed_dates == UnparsedDatePolicy::DropEverywhere {
            records.retain(AccountRecord::has_parsed_date);
            dropped_by_policy = unparsed_dates;
        }

        let filter = FilterEngine::new(&records);

        let metadata = SnapshotMetadata {
            loaded_at: Utc::now().to_rfc3339(),
            records_loaded,
            unparsed_dates,
            dropped_by_policy,
        };
        debug!(?metadata, "snapshot built");

        Self {
            records,
            config,
            filter,
            metadata,
        }
    }

    pub fn records(&self) -> &[AccountRecord] {
        &self.records
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    /// Observed values per filter dimension, sorted, missing last.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            organizations: self.filter.universe(Dimension::Organization),
            providers: self.filter.universe(Dimension::Provider),
            customer_types: self.filter.universe(Dimension::CustomerType),
            customer_categories: self.filter.universe(Dimension::CustomerCategory),
        }
    }

    /// Run one pass: validate, filter, aggregate.
    ///
    /// Invalid criteria fail before any filtering happens.
    pub fn run(&self, criteria: &FilterCriteria) -> Result<DashboardView<'_>> {
        criteria.validate()?;

        let records = self.filter.apply(&self.records, criteria);
        let aggregates = AccountAggregator::new(self.config.tie_break).aggregate(&records, criteria);

        debug!(
            filtered = records.len(),
            total = self.records.len(),
            "pipeline pass complete"
        );

        Ok(DashboardView {
            records,
            aggregates,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
