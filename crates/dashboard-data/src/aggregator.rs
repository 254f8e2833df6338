//! KPI, ranking, distribution, trend and growth aggregation over a filtered
//! record set.
//!
//! Every function accepts an empty input and degrades to zero counts or
//! empty lists.

use std::collections::{BTreeMap, HashMap, HashSet};

use dashboard_core::criteria::{FilterCriteria, Metric, TieBreak};
use dashboard_core::formatting::percentage;
use dashboard_core::models::{AccountRecord, Category, Dimension};
use dashboard_core::time_utils::MonthKey;
use serde::Serialize;

// ── Result types ──────────────────────────────────────────────────────────────

/// Headline scalar metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Kpis {
    /// Number of filtered records (rows).
    pub record_count: u64,
    pub distinct_accounts: u64,
    pub distinct_organizations: u64,
    pub distinct_providers: u64,
    /// Sum of `credential_count`; repeated accounts count every time.
    pub total_credentials: u64,
}

/// One entry of a top-N ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub category: Category,
    pub value: u64,
}

/// Occurrence count of one category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

/// Record count of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub period: MonthKey,
    /// `Mon-YYYY` display form of `period`.
    pub label: String,
    pub count: u64,
}

/// Latest month against the calendar month before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodGrowth {
    pub metric: Metric,
    /// Most recent month present in the filtered set.
    pub current_period: Option<MonthKey>,
    /// The calendar month before `current_period`, whether or not it has data.
    pub previous_period: Option<MonthKey>,
    pub current_value: u64,
    pub previous_value: u64,
    /// `(current - previous) / previous * 100`, two decimals; `0.0` when
    /// `previous_value` is zero.
    pub growth_pct: f64,
}

impl PeriodGrowth {
    fn empty(metric: Metric) -> Self {
        Self {
            metric,
            current_period: None,
            previous_period: None,
            current_value: 0,
            previous_value: 0,
            growth_pct: 0.0,
        }
    }
}

/// Immutable snapshot of every aggregate for one criteria application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub metric: Metric,
    pub top_n: usize,
    pub kpis: Kpis,
    pub top_organizations: Vec<RankedEntry>,
    pub customer_types: Vec<CategoryCount>,
    pub account_statuses: Vec<CategoryCount>,
    pub customer_categories: Vec<CategoryCount>,
    pub providers: Vec<CategoryCount>,
    pub monthly_trend: Vec<TrendPoint>,
    pub growth: PeriodGrowth,
}

// ── AccountAggregator ─────────────────────────────────────────────────────────

/// Computes aggregates; holds only the tie-break policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountAggregator {
    tie_break: TieBreak,
}

impl AccountAggregator {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    /// Compute every aggregate for `records` under `criteria`.
    pub fn aggregate(&self, records: &[&AccountRecord], criteria: &FilterCriteria) -> AggregateResult {
        let metric = criteria.selected_metric;
        AggregateResult {
            metric,
            top_n: criteria.top_n,
            kpis: Self::kpis(records),
            top_organizations: self.top_n(records, Dimension::Organization, metric, criteria.top_n),
            customer_types: self.distribution(records, Dimension::CustomerType),
            account_statuses: self.distribution(records, Dimension::AccountStatus),
            customer_categories: self.distribution(records, Dimension::CustomerCategory),
            providers: self.distribution(records, Dimension::Provider),
            monthly_trend: Self::monthly_trend(records),
            growth: Self::period_growth(records, metric),
        }
    }

    /// Headline counts. Distinct counts ignore the missing category.
    pub fn kpis(records: &[&AccountRecord]) -> Kpis {
        Kpis {
            record_count: records.len() as u64,
            distinct_accounts: distinct_values(records, |r| &r.record.account_id),
            distinct_organizations: distinct_values(records, |r| &r.record.organization_name),
            distinct_providers: distinct_values(records, |r| &r.record.provider_alias),
            total_credentials: total_credentials(records),
        }
    }

    /// Group by `dimension`, score each group with `metric`, sort descending
    /// and keep the first `n`.
    pub fn top_n(
        &self,
        records: &[&AccountRecord],
        dimension: Dimension,
        metric: Metric,
        n: usize,
    ) -> Vec<RankedEntry> {
        let mut ranked: Vec<RankedEntry> = group_first_seen(records, dimension)
            .into_iter()
            .map(|(category, members)| RankedEntry {
                category: category.clone(),
                value: metric_value(&members, metric),
            })
            .collect();

        self.sort_descending(&mut ranked, |e| e.value, |e| &e.category);
        ranked.truncate(n);
        ranked
    }

    /// Occurrence count per value of `dimension`, most frequent first.
    pub fn distribution(&self, records: &[&AccountRecord], dimension: Dimension) -> Vec<CategoryCount> {
        let mut counts: Vec<CategoryCount> = group_first_seen(records, dimension)
            .into_iter()
            .map(|(category, members)| CategoryCount {
                category: category.clone(),
                count: members.len() as u64,
            })
            .collect();

        self.sort_descending(&mut counts, |c| c.count, |c| &c.category);
        counts
    }

    /// Record count per month in chronological order. Records without a
    /// period bucket are skipped.
    pub fn monthly_trend(records: &[&AccountRecord]) -> Vec<TrendPoint> {
        let mut by_month: BTreeMap<MonthKey, u64> = BTreeMap::new();
        for period in records.iter().filter_map(|r| r.period_bucket) {
            *by_month.entry(period).or_default() += 1;
        }

        by_month
            .into_iter()
            .map(|(period, count)| TrendPoint {
                label: period.label(),
                period,
                count,
            })
            .collect()
    }

    /// Compare the latest month against the calendar month before it.
    pub fn period_growth(records: &[&AccountRecord], metric: Metric) -> PeriodGrowth {
        let Some(current) = records.iter().filter_map(|r| r.period_bucket).max() else {
            return PeriodGrowth::empty(metric);
        };
        let previous = current.previous();

        let in_period = |period: MonthKey| {
            records
                .iter()
                .copied()
                .filter(|r| r.period_bucket == Some(period))
                .collect::<Vec<_>>()
        };
        let current_value = metric_value(&in_period(current), metric);
        let previous_value = metric_value(&in_period(previous), metric);

        let growth_pct = percentage(
            current_value as f64 - previous_value as f64,
            previous_value as f64,
            2,
        );

        PeriodGrowth {
            metric,
            current_period: Some(current),
            previous_period: Some(previous),
            current_value,
            previous_value,
            growth_pct,
        }
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Stable sort by descending value; ties follow the tie-break policy.
    fn sort_descending<T>(
        &self,
        items: &mut [T],
        value: impl Fn(&T) -> u64,
        category: impl Fn(&T) -> &Category,
    ) {
        match self.tie_break {
            TieBreak::FirstSeen => items.sort_by(|a, b| value(b).cmp(&value(a))),
            TieBreak::Alphabetical => items.sort_by(|a, b| {
                value(b)
                    .cmp(&value(a))
                    .then_with(|| category(a).cmp(category(b)))
            }),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Value of `metric` over a group of records.
pub fn metric_value(records: &[&AccountRecord], metric: Metric) -> u64 {
    match metric {
        Metric::Accounts => distinct_values(records, |r| &r.record.account_id),
        Metric::Credentials => total_credentials(records),
    }
}

fn total_credentials(records: &[&AccountRecord]) -> u64 {
    records.iter().map(|r| r.credential_count as u64).sum()
}

fn distinct_values<'a>(
    records: &[&'a AccountRecord],
    field: impl Fn(&'a AccountRecord) -> &'a Category,
) -> u64 {
    records
        .iter()
        .map(|&r| field(r))
        .filter(|c| !c.is_missing())
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Group records by `dimension`, groups ordered by first appearance.
fn group_first_seen<'a>(
    records: &[&'a AccountRecord],
    dimension: Dimension,
) -> Vec<(&'a Category, Vec<&'a AccountRecord>)> {
    let mut index: HashMap<&Category, usize> = HashMap::new();
    let mut groups: Vec<(&Category, Vec<&AccountRecord>)> = Vec::new();

    for &record in records {
        let key = record.category(dimension);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    groups
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::derive_attributes;
    use crate::normalizer::normalize_record;
    use dashboard_core::models::RawRecord;

    fn make_record(id: &str, org: &str, date: &str, creds: &str) -> AccountRecord {
        derive_attributes(normalize_record(&RawRecord::from_pairs([
            ("account_id", id),
            ("organization_name", org),
            ("provider_alias", "p1"),
            ("customer_type", "Enterprise"),
            ("account_status", "active"),
            ("account_created_date", date),
            ("credential_id", creds),
        ])))
    }

    fn refs(records: &[AccountRecord]) -> Vec<&AccountRecord> {
        records.iter().collect()
    }

    fn value(v: &str) -> Category {
        Category::Value(v.to_string())
    }

    /// A has 3 accounts, B has 5, C has 2; B appears last.
    fn ranking_fixture() -> Vec<AccountRecord> {
        let mut records = Vec::new();
        for i in 0..3 {
            records.push(make_record(&format!("a{i}"), "A", "01-01-2026 00:00", "x"));
        }
        for i in 0..2 {
            records.push(make_record(&format!("c{i}"), "C", "01-01-2026 00:00", "x,y,z"));
        }
        for i in 0..5 {
            records.push(make_record(&format!("b{i}"), "B", "01-01-2026 00:00", ""));
        }
        records
    }

    // ── kpis ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_kpis_distinct_and_totals() {
        let records = vec![
            make_record("1", "A", "01-01-2026 00:00", "x,y"),
            make_record("1", "A", "02-01-2026 00:00", "z"),
            make_record("2", "B", "03-01-2026 00:00", ""),
            make_record("", "", "04-01-2026 00:00", "q"),
        ];
        let kpis = AccountAggregator::kpis(&refs(&records));

        assert_eq!(kpis.record_count, 4);
        assert_eq!(kpis.distinct_accounts, 2);
        assert_eq!(kpis.distinct_organizations, 2);
        assert_eq!(kpis.distinct_providers, 1);
        // Repeated account "1" contributes both rows' credentials.
        assert_eq!(kpis.total_credentials, 4);
    }

    #[test]
    fn test_kpis_empty() {
        assert_eq!(AccountAggregator::kpis(&[]), Kpis::default());
    }

    // ── top_n ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_top_n_by_accounts() {
        let records = ranking_fixture();
        let ranked = AccountAggregator::default().top_n(
            &refs(&records),
            Dimension::Organization,
            Metric::Accounts,
            2,
        );
        assert_eq!(
            ranked,
            vec![
                RankedEntry { category: value("B"), value: 5 },
                RankedEntry { category: value("A"), value: 3 },
            ]
        );
    }

    #[test]
    fn test_top_n_by_credentials() {
        let records = ranking_fixture();
        let ranked = AccountAggregator::default().top_n(
            &refs(&records),
            Dimension::Organization,
            Metric::Credentials,
            10,
        );
        let pairs: Vec<(&str, u64)> = ranked.iter().map(|e| (e.category.label(), e.value)).collect();
        assert_eq!(pairs, vec![("C", 6), ("A", 3), ("B", 0)]);
    }

    #[test]
    fn test_top_n_counts_distinct_accounts() {
        let records = vec![
            make_record("dup", "A", "01-01-2026 00:00", ""),
            make_record("dup", "A", "01-01-2026 00:00", ""),
            make_record("other", "B", "01-01-2026 00:00", ""),
            make_record("other2", "B", "01-01-2026 00:00", ""),
        ];
        let ranked = AccountAggregator::default().top_n(
            &refs(&records),
            Dimension::Organization,
            Metric::Accounts,
            5,
        );
        assert_eq!(ranked[0], RankedEntry { category: value("B"), value: 2 });
        assert_eq!(ranked[1], RankedEntry { category: value("A"), value: 1 });
    }

    #[test]
    fn test_top_n_ties_first_seen() {
        let records = vec![
            make_record("1", "Zeta", "01-01-2026 00:00", ""),
            make_record("2", "Alpha", "01-01-2026 00:00", ""),
        ];
        let ranked = AccountAggregator::new(TieBreak::FirstSeen).top_n(
            &refs(&records),
            Dimension::Organization,
            Metric::Accounts,
            2,
        );
        assert_eq!(ranked[0].category, value("Zeta"));
        assert_eq!(ranked[1].category, value("Alpha"));
    }

    #[test]
    fn test_top_n_ties_alphabetical() {
        let records = vec![
            make_record("1", "Zeta", "01-01-2026 00:00", ""),
            make_record("2", "Alpha", "01-01-2026 00:00", ""),
        ];
        let ranked = AccountAggregator::new(TieBreak::Alphabetical).top_n(
            &refs(&records),
            Dimension::Organization,
            Metric::Accounts,
            2,
        );
        assert_eq!(ranked[0].category, value("Alpha"));
        assert_eq!(ranked[1].category, value("Zeta"));
    }

    #[test]
    fn test_top_n_includes_missing_organization() {
        let records = vec![
            make_record("1", "", "01-01-2026 00:00", ""),
            make_record("2", "", "01-01-2026 00:00", ""),
            make_record("3", "A", "01-01-2026 00:00", ""),
        ];
        let ranked = AccountAggregator::default().top_n(
            &refs(&records),
            Dimension::Organization,
            Metric::Accounts,
            1,
        );
        assert_eq!(ranked, vec![RankedEntry { category: Category::Missing, value: 2 }]);
    }

    #[test]
    fn test_top_n_empty() {
        let ranked =
            AccountAggregator::default().top_n(&[], Dimension::Organization, Metric::Accounts, 10);
        assert!(ranked.is_empty());
    }

    // ── distribution ──────────────────────────────────────────────────────────

    #[test]
    fn test_distribution_counts_rows() {
        let mut records = ranking_fixture();
        records.push(derive_attributes(normalize_record(&RawRecord::from_pairs([
            ("account_id", "x"),
            ("account_status", "closed"),
        ]))));
        let dist = AccountAggregator::default().distribution(&refs(&records), Dimension::AccountStatus);
        assert_eq!(
            dist,
            vec![
                CategoryCount { category: value("active"), count: 10 },
                CategoryCount { category: value("closed"), count: 1 },
            ]
        );
    }

    #[test]
    fn test_distribution_is_reproducible() {
        let records = ranking_fixture();
        let agg = AccountAggregator::default();
        let first = agg.distribution(&refs(&records), Dimension::Organization);
        let second = agg.distribution(&refs(&records), Dimension::Organization);
        assert_eq!(first, second);
    }

    // ── monthly_trend ─────────────────────────────────────────────────────────

    #[test]
    fn test_monthly_trend_chronological_not_lexical() {
        let records = vec![
            make_record("1", "A", "10-01-2026 00:00", ""),
            make_record("2", "A", "10-02-2025 00:00", ""),
            make_record("3", "A", "11-02-2025 00:00", ""),
            make_record("4", "A", "31-02-2026 10:00", ""),
        ];
        let trend = AccountAggregator::monthly_trend(&refs(&records));

        let labels: Vec<&str> = trend.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Feb-2025", "Jan-2026"]);
        assert_eq!(trend[0].count, 2);
        // The unparsed date is not in any bucket.
        assert_eq!(trend.iter().map(|p| p.count).sum::<u64>(), 3);
    }

    #[test]
    fn test_monthly_trend_empty() {
        assert!(AccountAggregator::monthly_trend(&[]).is_empty());
    }

    // ── period_growth ─────────────────────────────────────────────────────────

    #[test]
    fn test_growth_basic() {
        let records = vec![
            make_record("1", "A", "10-01-2026 00:00", ""),
            make_record("2", "A", "10-01-2026 00:00", ""),
            make_record("3", "A", "10-02-2026 00:00", ""),
            make_record("4", "A", "11-02-2026 00:00", ""),
            make_record("5", "A", "12-02-2026 00:00", ""),
        ];
        let growth = AccountAggregator::period_growth(&refs(&records), Metric::Accounts);
        assert_eq!(growth.current_period, MonthKey::new(2026, 2));
        assert_eq!(growth.previous_period, MonthKey::new(2026, 1));
        assert_eq!(growth.current_value, 3);
        assert_eq!(growth.previous_value, 2);
        assert!((growth.growth_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_zero_previous_is_zero() {
        let records: Vec<AccountRecord> = (0..5)
            .map(|i| make_record(&i.to_string(), "A", "01-03-2026 00:00", ""))
            .collect();
        let growth = AccountAggregator::period_growth(&refs(&records), Metric::Accounts);
        assert_eq!(growth.current_value, 5);
        assert_eq!(growth.previous_value, 0);
        assert_eq!(growth.growth_pct, 0.0);
    }

    #[test]
    fn test_growth_gap_month_is_previous() {
        // December and February only: January is the previous month and has
        // no records, so growth saturates to 0.
        let records = vec![
            make_record("1", "A", "05-12-2025 00:00", "a,b"),
            make_record("2", "A", "05-02-2026 00:00", "c"),
        ];
        let growth = AccountAggregator::period_growth(&refs(&records), Metric::Credentials);
        assert_eq!(growth.current_period, MonthKey::new(2026, 2));
        assert_eq!(growth.previous_period, MonthKey::new(2026, 1));
        assert_eq!(growth.previous_value, 0);
        assert_eq!(growth.growth_pct, 0.0);
    }

    #[test]
    fn test_growth_across_year_boundary_with_rounding() {
        let records = vec![
            make_record("1", "A", "05-12-2025 00:00", "a,b,c"),
            make_record("2", "A", "05-01-2026 00:00", "d"),
        ];
        let growth = AccountAggregator::period_growth(&refs(&records), Metric::Credentials);
        assert_eq!(growth.previous_period, MonthKey::new(2025, 12));
        // (1 - 3) / 3 * 100 = -66.666…
        assert!((growth.growth_pct - -66.67).abs() < 1e-9);
    }

    #[test]
    fn test_growth_empty() {
        let growth = AccountAggregator::period_growth(&[], Metric::Accounts);
        assert!(growth.current_period.is_none());
        assert_eq!(growth.growth_pct, 0.0);
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_empty_set_degrades() {
        let criteria = FilterCriteria::default();
        let result = AccountAggregator::default().aggregate(&[], &criteria);
        assert_eq!(result.kpis, Kpis::default());
        assert!(result.top_organizations.is_empty());
        assert!(result.customer_types.is_empty());
        assert!(result.account_statuses.is_empty());
        assert!(result.monthly_trend.is_empty());
        assert_eq!(result.growth.growth_pct, 0.0);
    }

    #[test]
    fn test_aggregate_uses_criteria_metric_and_top_n() {
        let records = ranking_fixture();
        let criteria = FilterCriteria::default()
            .with_metric(Metric::Credentials)
            .with_top_n(1)
            .unwrap();
        let result = AccountAggregator::default().aggregate(&refs(&records), &criteria);
        assert_eq!(result.metric, Metric::Credentials);
        assert_eq!(result.top_organizations.len(), 1);
        assert_eq!(result.top_organizations[0].category, value("C"));
        assert_eq!(result.kpis.total_credentials, 9);
    }
}
