//! Ingestion adapters for usage, forecast, function, and attribution extracts
//!
//! Column lookup is case-insensitive and tolerates the alternate names used by
//! older export queries. Every adapter produces strongly typed rows before any
//! analytics code runs.

pub mod attribution_csv;
pub mod forecast_csv;
pub mod function_csv;
pub mod usage_csv;

pub use attribution_csv::AttributionCsvParser;
pub use forecast_csv::ForecastCsvParser;
pub use function_csv::FunctionCsvParser;
pub use usage_csv::UsageCsvParser;

use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;

/// A required or optional column: canonical name plus accepted alternates
pub(crate) struct ColumnSpec {
    pub name: &'static str,
    pub alternates: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            alternates: &[],
        }
    }

    pub const fn with_alternates(name: &'static str, alternates: &'static [&'static str]) -> Self {
        Self { name, alternates }
    }
}

/// Header positions keyed by upper-cased, trimmed column name
pub(crate) struct ColumnMap {
    index: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            // First occurrence wins for duplicated headers
            index
                .entry(h.trim().trim_start_matches('\u{feff}').to_uppercase())
                .or_insert(i);
        }
        Self { index }
    }

    /// Position of a column, trying the canonical name then each alternate
    pub fn find(&self, spec: &ColumnSpec) -> Option<usize> {
        std::iter::once(spec.name)
            .chain(spec.alternates.iter().copied())
            .find_map(|name| self.index.get(name).copied())
    }

    /// Resolve every spec, or fail listing the canonical names that are absent
    pub fn require(&self, specs: &[ColumnSpec]) -> Result<Vec<usize>, CoreError> {
        let mut positions = Vec::with_capacity(specs.len());
        let mut missing = Vec::new();

        for spec in specs {
            match self.find(spec) {
                Some(pos) => positions.push(pos),
                None => missing.push(spec.name.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(positions)
        } else {
            Err(CoreError::MissingColumns { missing })
        }
    }
}

/// 1-based line of a record, for error messages
pub(crate) fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Field at `pos`, trimmed; missing trailing fields read as blank
pub(crate) fn field(record: &StringRecord, pos: usize) -> &str {
    record.get(pos).map(str::trim).unwrap_or("")
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 timestamps
pub(crate) fn parse_date(value: &str, line: u64) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| CoreError::InvalidDate {
            line,
            value: value.to_string(),
        })
}

/// Blank reads as `None`; anything else must be a finite number
pub(crate) fn parse_optional_f64(
    value: &str,
    line: u64,
    column: &str,
) -> Result<Option<f64>, CoreError> {
    if value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match value.replace(',', "").parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid_number(value, line, column)),
    }
}

/// Non-negative count; blank reads as 0 and whole-valued floats (`12.0`) are accepted
pub(crate) fn parse_count(value: &str, line: u64, column: &str) -> Result<u64, CoreError> {
    if value.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = value.parse::<u64>() {
        return Ok(v);
    }
    match parse_optional_f64(value, line, column)? {
        Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        Some(_) => Err(invalid_number(value, line, column)),
        None => Ok(0),
    }
}

fn invalid_number(value: &str, line: u64, column: &str) -> CoreError {
    CoreError::InvalidNumber {
        line,
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Map an open failure to `FileNotFound` or `FileRead`
pub(crate) fn open_error(path: &Path, e: std::io::Error) -> CoreError {
    if e.kind() == std::io::ErrorKind::NotFound {
        CoreError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        CoreError::FileRead {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_map_case_insensitive_with_alternates() {
        let headers = StringRecord::from(vec!["usage_date", "Service", "total_credits"]);
        let map = ColumnMap::from_headers(&headers);

        let date = ColumnSpec::with_alternates("DATE", &["USAGE_DATE"]);
        let service = ColumnSpec::with_alternates("SERVICE_TYPE", &["SERVICE"]);
        assert_eq!(map.find(&date), Some(0));
        assert_eq!(map.find(&service), Some(1));
        assert_eq!(map.find(&ColumnSpec::new("TOTAL_CREDITS")), Some(2));
    }

    #[test]
    fn test_column_map_first_duplicate_wins() {
        let headers = StringRecord::from(vec!["\u{feff}DATE", "TOTAL_CREDITS", "total_credits "]);
        let map = ColumnMap::from_headers(&headers);

        assert_eq!(map.find(&ColumnSpec::new("DATE")), Some(0));
        assert_eq!(map.find(&ColumnSpec::new("TOTAL_CREDITS")), Some(1));
    }

    #[test]
    fn test_column_map_reports_missing() {
        let headers = StringRecord::from(vec!["DATE"]);
        let map = ColumnMap::from_headers(&headers);

        let err = map
            .require(&[ColumnSpec::new("DATE"), ColumnSpec::new("TOTAL_CREDITS")])
            .unwrap_err();
        match err {
            CoreError::MissingColumns { missing } => assert_eq!(missing, vec!["TOTAL_CREDITS"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(parse_date("2025-01-05", 2).unwrap(), expected);
        assert_eq!(parse_date("2025-01-05 13:45:00", 2).unwrap(), expected);
        assert_eq!(parse_date("2025-01-05T08:00:00Z", 2).unwrap(), expected);
        assert!(matches!(
            parse_date("05/01/2025", 7),
            Err(CoreError::InvalidDate { line: 7, .. })
        ));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_optional_f64("", 1, "X").unwrap(), None);
        assert_eq!(parse_optional_f64("1,234.5", 1, "X").unwrap(), Some(1234.5));
        assert!(parse_optional_f64("abc", 1, "X").is_err());

        assert_eq!(parse_count("12", 1, "X").unwrap(), 12);
        assert_eq!(parse_count("12.0", 1, "X").unwrap(), 12);
        assert_eq!(parse_count("", 1, "X").unwrap(), 0);
        assert!(parse_count("-3", 1, "X").is_err());
    }
}
