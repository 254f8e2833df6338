use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

use crate::error::{DashboardError, Result};

/// The only accepted textual form of `account_created_date`.
pub const CREATED_DATE_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Parse an `account_created_date` value (`DD-MM-YYYY HH:MM`).
///
/// Surrounding whitespace is ignored. Returns `None` for anything that is not
/// zero-padded `DD-MM-YYYY HH:MM` with a single separating space, and for
/// impossible calendar dates (e.g. `31-02-2026 10:00`).
pub fn parse_created_date(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if !matches_shape(trimmed, CREATED_DATE_SHAPE) {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, CREATED_DATE_FORMAT).ok()
}

/// Character layout of [`CREATED_DATE_FORMAT`]; letters stand for one digit.
const CREATED_DATE_SHAPE: &str = "DD-MM-YYYY HH:MM";

/// Byte-wise layout check. chrono lets a format space match any run of
/// whitespace (or none) and accepts unpadded fields.
fn matches_shape(text: &str, shape: &str) -> bool {
    text.len() == shape.len()
        && text.bytes().zip(shape.bytes()).all(|(c, slot)| {
            if slot.is_ascii_alphabetic() {
                c.is_ascii_digit()
            } else {
                c == slot
            }
        })
}

// ── MonthKey ──────────────────────────────────────────────────────────────────

/// A calendar month used as the period bucket.
///
/// Ordering is chronological (year, then month). `Display` renders the
/// sortable `YYYY-MM` form; [`MonthKey::label`] renders `Mon-YYYY` for
/// presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key, returning `None` when `month` is outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `dt`.
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The immediately preceding calendar month (January rolls back a year).
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Human-readable label, e.g. `"Jan-2026"`.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(first) => first.format("%b-%Y").to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Date-range bounds ─────────────────────────────────────────────────────────

/// Which end of a date range a bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Start,
    End,
}

/// Parse a user-supplied date-range bound.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS]`, `DD-MM-YYYY HH:MM`, `YYYY-MM-DD` and
/// `DD-MM-YYYY`. A date-only bound expands to the start of the day for
/// [`BoundSide::Start`] and to the last instant of the day for
/// [`BoundSide::End`], so both ends stay inclusive at day granularity.
pub fn parse_date_bound(s: &str, side: BoundSide) -> Result<NaiveDateTime> {
    let trimmed = s.trim();

    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", CREATED_DATE_FORMAT];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            let time = match side {
                BoundSide::Start => NaiveTime::MIN,
                BoundSide::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
                    .unwrap_or(NaiveTime::MIN),
            };
            return Ok(date.and_time(time));
        }
    }

    Err(DashboardError::DateBound(s.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
