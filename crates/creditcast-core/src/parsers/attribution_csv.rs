//! User attribution extract parser

use super::{field, line_of, open_error, parse_count, parse_date, parse_optional_f64};
use super::{ColumnMap, ColumnSpec};
use crate::error::{CoreError, LoadReport};
use crate::models::AttributionRecord;
use std::io::Read;
use std::path::Path;

const REQUIRED: [ColumnSpec; 7] = [
    ColumnSpec::with_alternates("USAGE_DATE", &["DATE"]),
    ColumnSpec::new("USER_NAME"),
    ColumnSpec::with_alternates("SERVICE_TYPE", &["SERVICE"]),
    ColumnSpec::new("FEATURE_NAME"),
    ColumnSpec::new("MODEL_NAME"),
    ColumnSpec::new("CREDITS_USED"),
    ColumnSpec::new("OPERATIONS"),
];

/// Parser for per-user attribution extracts
#[derive(Default)]
pub struct AttributionCsvParser;

impl AttributionCsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file(
        &self,
        path: &Path,
        report: &mut LoadReport,
    ) -> Result<Vec<AttributionRecord>, CoreError> {
        let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;
        self.parse_reader(file, report)
    }

    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        report: &mut LoadReport,
    ) -> Result<Vec<AttributionRecord>, CoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(CoreError::EmptyFile);
        }
        let cols = ColumnMap::from_headers(&headers).require(&REQUIRED)?;

        let mut records = Vec::new();
        let mut blank_credits = 0usize;

        for result in csv_reader.records() {
            let record = result?;
            report.rows_read += 1;
            let line = line_of(&record);

            let Some(credits) = parse_optional_f64(field(&record, cols[5]), line, "CREDITS_USED")?
            else {
                blank_credits += 1;
                continue;
            };

            records.push(AttributionRecord {
                date: parse_date(field(&record, cols[0]), line)?,
                user_name: field(&record, cols[1]).to_string(),
                service: field(&record, cols[2]).to_string(),
                feature_name: field(&record, cols[3]).to_string(),
                model_name: field(&record, cols[4]).to_string(),
                credits_used: credits,
                operations: parse_count(field(&record, cols[6]), line, "OPERATIONS")?,
            });
        }

        if blank_credits > 0 {
            report.rows_excluded += blank_credits;
            report.add_warning(
                "attribution",
                format!("Excluded {} rows with blank CREDITS_USED", blank_credits),
            );
        }

        Ok(records)
    }
}
