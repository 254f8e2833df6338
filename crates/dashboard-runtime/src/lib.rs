//! Runtime layer for the account dashboard.
//!
//! Owns the currently loaded snapshot and decides when to reload it.

pub mod data_manager;

pub use dashboard_core as core;
pub use dashboard_data as data;
