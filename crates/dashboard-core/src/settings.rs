use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::criteria::{
    DateRange, DimensionFilter, FilterCriteria, Metric, PipelineConfig, TieBreak,
    UnparsedDatePolicy,
};
use crate::error::Result;
use crate::models::Dimension;
use crate::time_utils::{parse_date_bound, BoundSide};

/// Seconds a loaded snapshot stays fresh unless `--cache-ttl` says otherwise.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Customer account metrics from a tabular export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "account-dashboard",
    about = "Customer account metrics from a tabular export",
    version
)]
pub struct Settings {
    /// CSV file with one row per account
    #[arg(long, default_value = "data.csv")]
    pub data: PathBuf,

    /// Organization to include (repeatable; omit to select all, "" selects missing)
    #[arg(long = "organization")]
    pub organizations: Vec<String>,

    /// Provider alias to include (repeatable)
    #[arg(long = "provider")]
    pub providers: Vec<String>,

    /// Customer type to include (repeatable)
    #[arg(long = "customer-type")]
    pub customer_types: Vec<String>,

    /// Customer category to include (repeatable)
    #[arg(long = "customer-category")]
    pub customer_categories: Vec<String>,

    /// Inclusive start of the creation-date range
    #[arg(long)]
    pub from: Option<String>,

    /// Inclusive end of the creation-date range (a bare date covers the whole day)
    #[arg(long)]
    pub to: Option<String>,

    /// Apply the date-range filter even without bounds (drops unparsed dates)
    #[arg(long)]
    pub date_filter: bool,

    /// Metric used for the ranking and growth
    #[arg(long, default_value = "accounts", value_parser = ["accounts", "credentials"])]
    pub metric: String,

    /// Number of organizations in the ranking
    #[arg(long, default_value = "10", allow_negative_numbers = true)]
    pub top_n: i64,

    /// Treatment of records whose creation date does not parse
    #[arg(long, default_value = "keep", value_parser = ["keep", "drop"])]
    pub unparsed_dates: String,

    /// Ordering of ranking entries with equal values
    #[arg(long, default_value = "first-seen", value_parser = ["first-seen", "alphabetical"])]
    pub tie_break: String,

    /// Report format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub output: String,

    /// Write the filtered records to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Print the selectable values of every filter dimension and exit
    #[arg(long)]
    pub list_options: bool,

    /// Seconds a loaded snapshot stays fresh
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.account-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl LastUsedParams {
    /// Default location: `~/.account-dashboard/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".account-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// CLI value was provided.
    ///
    /// Nothing is written here; call [`Settings::persist_last_used`] once the
    /// settings have been validated.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path so tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("could not clear {}: {}", config_path.display(), e);
            }
            return settings;
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. Filters are never restored: they belong to a
        // single interaction.
        if !is_arg_explicitly_set(&matches, "data") {
            if let Some(v) = last.data {
                settings.data = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "metric") {
            if let Some(v) = last.metric {
                settings.metric = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_n") {
            // Restored values must still pass validation.
            if let Some(v) = last.top_n.filter(|&n| n > 0) {
                settings.top_n = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output") {
            if let Some(v) = last.output {
                settings.output = v;
            }
        }

        settings
    }

    /// Save the last-used params to `~/.account-dashboard/last_used.json`.
    ///
    /// Skipped after `--clear`. Failures are logged, never fatal.
    pub fn persist_last_used(&self) {
        self.persist_last_used_to(&LastUsedParams::config_path());
    }

    /// Same as [`Settings::persist_last_used`] with an explicit path.
    pub fn persist_last_used_to(&self, config_path: &std::path::Path) {
        if self.clear {
            return;
        }
        if let Err(e) = LastUsedParams::from(self).save_to(config_path) {
            tracing::debug!("could not persist last-used params: {}", e);
        }
    }

    /// Build validated filter criteria from the CLI selections.
    pub fn filter_criteria(&self) -> Result<FilterCriteria> {
        let metric: Metric = self.metric.parse()?;
        let mut criteria = FilterCriteria::default()
            .with_top_n(self.top_n)?
            .with_metric(metric);

        let selections = [
            (Dimension::Organization, &self.organizations),
            (Dimension::Provider, &self.providers),
            (Dimension::CustomerType, &self.customer_types),
            (Dimension::CustomerCategory, &self.customer_categories),
        ];
        for (dimension, values) in selections {
            if !values.is_empty() {
                criteria =
                    criteria.with_dimension(dimension, DimensionFilter::from_selection(values));
            }
        }

        if self.date_filter || self.from.is_some() || self.to.is_some() {
            let from = self
                .from
                .as_deref()
                .map(|s| parse_date_bound(s, BoundSide::Start))
                .transpose()?;
            let to = self
                .to
                .as_deref()
                .map(|s| parse_date_bound(s, BoundSide::End))
                .transpose()?;
            criteria = criteria.with_date_range(DateRange::new(from, to));
        }

        criteria.validate()?;
        Ok(criteria)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            unparsed_dates: self.unparsed_dates.parse::<UnparsedDatePolicy>()?,
            tie_break: self.tie_break.parse::<TieBreak>()?,
        })
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data: Some(s.data.clone()),
            metric: Some(s.metric.clone()),
            top_n: Some(s.top_n),
            output: Some(s.output.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
