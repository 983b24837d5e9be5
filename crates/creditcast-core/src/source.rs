//! Usage fetch protocol
//!
//! Sources report a typed `FetchOutcome` instead of an error so callers can
//! decide whether to fall back. `TwoStageFetch` chains a primary and a
//! secondary source; `FetchCache` memoizes loaded samples per lookback window.

use chrono::{Duration, Local, NaiveDate};
use moka::future::Cache;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CoreError, LoadReport};
use crate::models::{EstimatorConfig, ForecastRow, UsageSample};
use crate::parsers::{ForecastCsvParser, UsageCsvParser};

/// Result of one fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Loaded(T),
    /// Source reachable but returned no rows
    Empty,
    /// Source does not exist
    NotFound,
    /// Access refused; never retried against another source
    Denied(String),
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn into_loaded(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logs and status lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded(_) => "loaded",
            Self::Empty => "empty",
            Self::NotFound => "not found",
            Self::Denied(_) => "denied",
            Self::Failed(_) => "failed",
        }
    }
}

fn outcome_from_io<T>(path: &Path, error: std::io::Error) -> FetchOutcome<T> {
    match error.kind() {
        ErrorKind::NotFound => FetchOutcome::NotFound,
        ErrorKind::PermissionDenied => {
            FetchOutcome::Denied(format!("{}: {}", path.display(), error))
        }
        _ => FetchOutcome::Failed(format!("{}: {}", path.display(), error)),
    }
}

fn log_report(source: &str, report: &LoadReport) {
    for entry in &report.errors {
        warn!(source, message = %entry.message, "Load finding");
    }
}

/// Anything that can produce a usage sample for a lookback window
pub trait UsageSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn fetch(&self, lookback_days: u32) -> impl Future<Output = FetchOutcome<UsageSample>> + Send;
}

/// Usage extract stored as a CSV file
#[derive(Debug, Clone)]
pub struct CsvUsageSource {
    path: PathBuf,
    /// Reference date for the lookback window, today when unset
    as_of: Option<NaiveDate>,
    name: String,
}

impl CsvUsageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            as_of: None,
            name,
        }
    }

    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file, then keep rows inside the window
    ///
    /// Exposed for callers that want the `LoadReport` rather than logs.
    pub async fn load(
        &self,
        lookback_days: u32,
        report: &mut LoadReport,
    ) -> Result<UsageSample, CoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    CoreError::FileNotFound {
                        path: self.path.clone(),
                    }
                } else {
                    CoreError::FileRead {
                        path: self.path.clone(),
                        source,
                    }
                }
            })?;

        let sample = UsageCsvParser::new().parse_str(&content, report)?;
        Ok(self.window(sample, lookback_days))
    }

    fn window(&self, sample: UsageSample, lookback_days: u32) -> UsageSample {
        let as_of = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        let cutoff = as_of - Duration::days(i64::from(lookback_days));
        let kept: Vec<_> = sample
            .records()
            .iter()
            .filter(|r| r.date >= cutoff)
            .cloned()
            .collect();
        debug!(
            source = %self.name,
            %cutoff,
            kept = kept.len(),
            dropped = sample.len() - kept.len(),
            "Applied lookback window"
        );
        UsageSample::new(kept)
    }
}

impl UsageSource for CsvUsageSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, lookback_days: u32) -> FetchOutcome<UsageSample> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => return outcome_from_io(&self.path, e),
        };

        let mut report = LoadReport::new();
        let parsed = UsageCsvParser::new().parse_str(&content, &mut report);
        log_report(&self.name, &report);

        match parsed {
            Ok(sample) => {
                let sample = self.window(sample, lookback_days);
                if sample.is_empty() {
                    FetchOutcome::Empty
                } else {
                    FetchOutcome::Loaded(sample)
                }
            }
            Err(CoreError::EmptyFile) => FetchOutcome::Empty,
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

/// Primary source with a secondary fallback
///
/// The secondary is consulted when the primary is empty, missing, or failed.
/// A denial stops the chain and is surfaced as is.
#[derive(Debug, Clone)]
pub struct TwoStageFetch<P, S> {
    primary: P,
    secondary: S,
}

impl<P: UsageSource, S: UsageSource> TwoStageFetch<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: UsageSource, S: UsageSource> UsageSource for TwoStageFetch<P, S> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch(&self, lookback_days: u32) -> FetchOutcome<UsageSample> {
        let outcome = self.primary.fetch(lookback_days).await;
        match outcome {
            FetchOutcome::Loaded(_) => outcome,
            FetchOutcome::Denied(ref message) => {
                warn!(source = self.primary.name(), %message, "Primary source denied, not falling back");
                outcome
            }
            other => {
                if let FetchOutcome::Failed(ref message) = other {
                    warn!(source = self.primary.name(), %message, "Primary source failed");
                }
                info!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    outcome = other.label(),
                    "Falling back to secondary source"
                );
                self.secondary.fetch(lookback_days).await
            }
        }
    }
}

/// Time-boxed memoization of a source, keyed by lookback days
///
/// Only `Loaded` outcomes are stored.
pub struct FetchCache<S> {
    source: S,
    cache: Cache<u32, UsageSample>,
}

impl<S: UsageSource> FetchCache<S> {
    pub fn new(source: S, ttl_secs: u64, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(std::time::Duration::from_secs(ttl_secs))
            .build();
        Self { source, cache }
    }

    pub fn from_config(source: S, config: &EstimatorConfig) -> Self {
        Self::new(source, config.cache_ttl_secs, config.cache_max_entries)
    }

    /// Drop every cached sample
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<S: UsageSource> UsageSource for FetchCache<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn fetch(&self, lookback_days: u32) -> FetchOutcome<UsageSample> {
        if let Some(sample) = self.cache.get(&lookback_days).await {
            debug!(source = self.source.name(), lookback_days, "Fetch cache hit");
            return FetchOutcome::Loaded(sample);
        }

        let outcome = self.source.fetch(lookback_days).await;
        if let FetchOutcome::Loaded(ref sample) = outcome {
            self.cache.insert(lookback_days, sample.clone()).await;
        }
        outcome
    }
}

/// Optional ML forecast table stored as CSV
///
/// Absence is normal: a missing file or a header-only file is not an error.
#[derive(Debug, Clone)]
pub struct CsvForecastSource {
    path: PathBuf,
}

impl CsvForecastSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn fetch(&self) -> FetchOutcome<Vec<ForecastRow>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => return outcome_from_io(&self.path, e),
        };

        let mut report = LoadReport::new();
        let parsed = ForecastCsvParser::new().parse_str(&content, &mut report);
        log_report("forecast", &report);

        match parsed {
            Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
            Ok(rows) => FetchOutcome::Loaded(rows),
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        let loaded: FetchOutcome<u8> = FetchOutcome::Loaded(3);
        assert!(loaded.is_loaded());
        assert_eq!(loaded.into_loaded(), Some(3));

        let denied: FetchOutcome<u8> = FetchOutcome::Denied("no grant".into());
        assert_eq!(denied.label(), "denied");
        assert_eq!(denied.into_loaded(), None);
    }

    #[test]
    fn test_io_error_mapping() {
        let path = Path::new("usage.csv");
        let not_found: FetchOutcome<()> =
            outcome_from_io(path, std::io::Error::from(ErrorKind::NotFound));
        assert_eq!(not_found, FetchOutcome::NotFound);

        let denied: FetchOutcome<()> =
            outcome_from_io(path, std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(denied, FetchOutcome::Denied(_)));

        let other: FetchOutcome<()> =
            outcome_from_io(path, std::io::Error::from(ErrorKind::InvalidData));
        assert!(matches!(other, FetchOutcome::Failed(_)));
    }
}
