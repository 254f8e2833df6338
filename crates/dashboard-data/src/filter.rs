//! Multi-dimension inclusion filtering.
//!
//! A record passes when it passes every active filter (logical AND). A
//! dimension selection that covers every value observed in the snapshot is
//! equivalent to "select all". Output keeps input order.

use std::collections::{BTreeSet, HashMap};

use dashboard_core::criteria::{DimensionFilter, FilterCriteria};
use dashboard_core::models::{AccountRecord, Category, Dimension};
use tracing::debug;

/// Filter evaluator bound to the value universe of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    universes: HashMap<Dimension, BTreeSet<Category>>,
}

impl FilterEngine {
    /// Record the observed values of every filterable dimension.
    pub fn new(records: &[AccountRecord]) -> Self {
        let mut universes: HashMap<Dimension, BTreeSet<Category>> = HashMap::new();
        for dimension in Dimension::FILTERABLE {
            let values = records
                .iter()
                .map(|r| r.category(dimension).clone())
                .collect();
            universes.insert(dimension, values);
        }
        Self { universes }
    }

    /// Observed values of `dimension`, sorted with the missing category last.
    pub fn universe(&self, dimension: Dimension) -> Vec<Category> {
        self.universes
            .get(&dimension)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Apply `criteria` and return the surviving records in input order.
    pub fn apply<'a, I>(&self, records: I, criteria: &FilterCriteria) -> Vec<&'a AccountRecord>
    where
        I: IntoIterator<Item = &'a AccountRecord>,
    {
        let mut seen = 0usize;
        let kept: Vec<&AccountRecord> = records
            .into_iter()
            .inspect(|_| seen += 1)
            .filter(|r| self.matches(r, criteria))
            .collect();
        debug!("Filter kept {} of {} records", kept.len(), seen);
        kept
    }

    /// Whether a single record passes every active filter.
    pub fn matches(&self, record: &AccountRecord, criteria: &FilterCriteria) -> bool {
        let dimensions_pass = Dimension::FILTERABLE.iter().all(|&dimension| {
            self.dimension_matches(dimension, record.category(dimension), criteria)
        });
        if !dimensions_pass {
            return false;
        }

        match &criteria.date_range {
            None => true,
            // An unparsed date cannot be judged within any range.
            Some(range) => record.created_at().is_some_and(|ts| range.contains(ts)),
        }
    }

    fn dimension_matches(
        &self,
        dimension: Dimension,
        value: &Category,
        criteria: &FilterCriteria,
    ) -> bool {
        match criteria.dimension_filter(dimension) {
            DimensionFilter::All => true,
            DimensionFilter::Only(selected) => {
                selected.contains(value) || self.covers_universe(dimension, selected)
            }
        }
    }

    fn covers_universe(&self, dimension: Dimension, selected: &BTreeSet<Category>) -> bool {
        self.universes
            .get(&dimension)
            .is_some_and(|universe| universe.is_subset(selected))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
