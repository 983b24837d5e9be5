//! Usage extract parser
//!
//! Validation mirrors the export query contract: required columns, parseable
//! dates, non-negative credits. Blank credits drop the row (never defaulted to
//! zero) and the remaining findings land in the `LoadReport`.

use super::{field, line_of, open_error, parse_count, parse_date, parse_optional_f64};
use super::{ColumnMap, ColumnSpec};
use crate::error::{CoreError, LoadError, LoadReport};
use crate::models::{UsageRecord, UsageSample};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const REQUIRED: [ColumnSpec; 5] = [
    ColumnSpec::with_alternates("DATE", &["USAGE_DATE"]),
    ColumnSpec::with_alternates("SERVICE_TYPE", &["SERVICE"]),
    ColumnSpec::new("DAILY_UNIQUE_USERS"),
    ColumnSpec::new("TOTAL_OPERATIONS"),
    ColumnSpec::new("TOTAL_CREDITS"),
];

const AVG_DAILY_COST: ColumnSpec = ColumnSpec::new("AVG_DAILY_COST_PER_USER");
const PROJECTED_MONTHLY_COST: ColumnSpec = ColumnSpec::new("PROJECTED_MONTHLY_COST_PER_USER");

/// Parser for daily usage CSV extracts
pub struct UsageCsvParser {
    /// Row count above which a performance warning is recorded
    large_file_rows: usize,
    /// Date span (days) above which a warning is recorded
    max_span_days: i64,
}

impl Default for UsageCsvParser {
    fn default() -> Self {
        Self {
            large_file_rows: 100_000,
            max_span_days: 730,
        }
    }
}

impl UsageCsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, large_file_rows: usize, max_span_days: i64) -> Self {
        self.large_file_rows = large_file_rows;
        self.max_span_days = max_span_days;
        self
    }

    /// Parse a file from disk
    pub fn parse_file(&self, path: &Path, report: &mut LoadReport) -> Result<UsageSample, CoreError> {
        let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;
        debug!(path = %path.display(), "Parsing usage CSV");
        self.parse_reader(file, report)
    }

    /// Parse CSV text held in memory
    pub fn parse_str(&self, content: &str, report: &mut LoadReport) -> Result<UsageSample, CoreError> {
        self.parse_reader(content.as_bytes(), report)
    }

    /// Parse any CSV byte stream with a header row
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        report: &mut LoadReport,
    ) -> Result<UsageSample, CoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(CoreError::EmptyFile);
        }

        let columns = ColumnMap::from_headers(&headers);
        let positions = columns.require(&REQUIRED)?;
        let (date_col, service_col, users_col, ops_col, credits_col) = (
            positions[0],
            positions[1],
            positions[2],
            positions[3],
            positions[4],
        );
        let avg_cost_col = columns.find(&AVG_DAILY_COST);
        let monthly_cost_col = columns.find(&PROJECTED_MONTHLY_COST);

        let mut records = Vec::new();
        let mut rows = 0usize;
        let mut null_credits = 0usize;
        let mut negative_credits = 0usize;

        for result in csv_reader.records() {
            let record = result?;
            rows += 1;
            let line = line_of(&record);

            let date = parse_date(field(&record, date_col), line)?;
            let credits = match parse_optional_f64(field(&record, credits_col), line, "TOTAL_CREDITS")? {
                Some(c) if c < 0.0 => {
                    negative_credits += 1;
                    continue;
                }
                Some(c) => c,
                None => {
                    null_credits += 1;
                    continue;
                }
            };

            let users = parse_optional_f64(field(&record, users_col), line, "DAILY_UNIQUE_USERS")?
                .unwrap_or(0.0)
                .max(0.0);
            let operations = parse_count(field(&record, ops_col), line, "TOTAL_OPERATIONS")?;

            let optional = |pos: Option<usize>, name: &str| -> Result<Option<f64>, CoreError> {
                match pos {
                    Some(p) => parse_optional_f64(field(&record, p), line, name),
                    None => Ok(None),
                }
            };

            records.push(UsageRecord {
                date,
                service: field(&record, service_col).to_string(),
                total_credits: credits,
                daily_unique_users: users,
                total_operations: operations,
                avg_daily_cost_per_user: optional(avg_cost_col, AVG_DAILY_COST.name)?,
                projected_monthly_cost_per_user: optional(monthly_cost_col, PROJECTED_MONTHLY_COST.name)?,
            });
        }

        if rows == 0 {
            return Err(CoreError::EmptyFile);
        }
        if negative_credits > 0 {
            return Err(CoreError::NegativeCredits {
                count: negative_credits,
            });
        }

        report.rows_read += rows;

        if null_credits > 0 {
            warn!(rows = null_credits, "Excluding rows with blank credits");
            report.rows_excluded += null_credits;
            report.add_warning(
                "usage",
                format!(
                    "Found {} rows with NULL credits. These will be excluded from calculations.",
                    null_credits
                ),
            );
        }

        if rows > self.large_file_rows {
            report.add_error(
                LoadError::warning(
                    "usage",
                    format!("Large file detected ({} rows). Processing may be slow.", rows),
                )
                .with_suggestion("Consider filtering the date range"),
            );
        }

        let sample = UsageSample::new(records);

        if let Some((first, last)) = sample.date_range() {
            let span = (last - first).num_days();
            if span > self.max_span_days {
                report.add_warning(
                    "usage",
                    format!(
                        "Date range spans {} days (> 2 years). This may impact performance.",
                        span
                    ),
                );
            }
            info!(
                rows,
                from = %first,
                to = %last,
                "Usage CSV loaded"
            );
        }

        let unknown = sample.unknown_services();
        if !unknown.is_empty() {
            report.add_warning(
                "usage",
                format!(
                    "Found unknown service types: {}. These will be included in analysis.",
                    unknown.join(", ")
                ),
            );
        }

        Ok(sample)
    }

    /// Parse with graceful degradation, recording the failure in the report
    pub fn parse_graceful(&self, path: &Path, report: &mut LoadReport) -> Option<UsageSample> {
        match self.parse_file(path, report) {
            Ok(sample) => Some(sample),
            Err(e) => {
                report.add_error(LoadError::from_core_error("usage", &e));
                None
            }
        }
    }
}
