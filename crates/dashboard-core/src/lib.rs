//! Core types for the account dashboard.
//!
//! Typed records and categories, filter criteria, date/month utilities,
//! display formatting, CLI settings and the shared error type.

pub mod criteria;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
