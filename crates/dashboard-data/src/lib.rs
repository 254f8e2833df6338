//! Data layer for the account dashboard.
//!
//! Reads CSV exports into raw rows, normalises them into typed records,
//! derives period buckets and credential counts, filters by dimension and
//! date range, and aggregates KPIs, rankings, distributions and trends.

pub mod aggregator;
pub mod analysis;
pub mod calculator;
pub mod export;
pub mod filter;
pub mod normalizer;
pub mod reader;

pub use dashboard_core as core;
