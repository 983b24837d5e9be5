//! Function/model usage extract parser
//!
//! Reads both the summary layout (`CALL_COUNT`, `TOTAL_CREDITS`) and the daily
//! trend layout (`USAGE_DATE`, `DAILY_CREDITS`). Only the function name and
//! the credits are required.

use super::{field, line_of, open_error, parse_count, parse_date, parse_optional_f64};
use super::{ColumnMap, ColumnSpec};
use crate::error::{CoreError, LoadReport};
use crate::models::FunctionUsageRecord;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

const REQUIRED: [ColumnSpec; 2] = [
    ColumnSpec::with_alternates("FUNCTION_NAME", &["FUNCTION"]),
    ColumnSpec::with_alternates("TOTAL_CREDITS", &["DAILY_CREDITS", "CREDITS_USED"]),
];

const DATE: ColumnSpec = ColumnSpec::with_alternates("USAGE_DATE", &["DATE"]);
const MODEL: ColumnSpec = ColumnSpec::with_alternates("MODEL_NAME", &["MODEL"]);
const CALLS: ColumnSpec = ColumnSpec::with_alternates("CALL_COUNT", &["TOTAL_CALLS", "CALLS"]);
const TOKENS: ColumnSpec = ColumnSpec::with_alternates("TOTAL_TOKENS", &["DAILY_TOKENS", "TOKENS"]);
const SERVERLESS: ColumnSpec = ColumnSpec::new("SERVERLESS_CALLS");
const COMPUTE: ColumnSpec = ColumnSpec::new("COMPUTE_CALLS");

/// Parser for function/model usage extracts
#[derive(Default)]
pub struct FunctionCsvParser;

impl FunctionCsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file(
        &self,
        path: &Path,
        report: &mut LoadReport,
    ) -> Result<Vec<FunctionUsageRecord>, CoreError> {
        let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;
        debug!(path = %path.display(), "Parsing function usage CSV");
        self.parse_reader(file, report)
    }

    /// A header-only extract yields no records rather than an error
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        report: &mut LoadReport,
    ) -> Result<Vec<FunctionUsageRecord>, CoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(CoreError::EmptyFile);
        }
        let columns = ColumnMap::from_headers(&headers);
        let cols = columns.require(&REQUIRED)?;
        let date_col = columns.find(&DATE);
        let model_col = columns.find(&MODEL);
        let calls_col = columns.find(&CALLS);
        let tokens_col = columns.find(&TOKENS);
        let serverless_col = columns.find(&SERVERLESS);
        let compute_col = columns.find(&COMPUTE);

        let mut records = Vec::new();
        let mut blank_credits = 0usize;
        let mut negative_credits = 0usize;

        for result in csv_reader.records() {
            let record = result?;
            report.rows_read += 1;
            let line = line_of(&record);

            let credits = match parse_optional_f64(field(&record, cols[1]), line, REQUIRED[1].name)? {
                Some(c) if c < 0.0 => {
                    negative_credits += 1;
                    continue;
                }
                Some(c) => c,
                None => {
                    blank_credits += 1;
                    continue;
                }
            };

            let count = |pos: Option<usize>, name: &str| -> Result<u64, CoreError> {
                match pos {
                    Some(p) => parse_count(field(&record, p), line, name),
                    None => Ok(0),
                }
            };
            let serverless_calls = count(serverless_col, SERVERLESS.name)?;
            let compute_calls = count(compute_col, COMPUTE.name)?;
            let call_count = match calls_col {
                Some(p) => parse_count(field(&record, p), line, CALLS.name)?,
                None => serverless_calls + compute_calls,
            };

            let date = match date_col.map(|p| field(&record, p)) {
                Some(value) if !value.is_empty() => Some(parse_date(value, line)?),
                _ => None,
            };
            let model_name = model_col
                .map(|p| field(&record, p))
                .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("null"))
                .map(str::to_string);

            records.push(FunctionUsageRecord {
                date,
                function_name: field(&record, cols[0]).to_uppercase(),
                model_name,
                call_count,
                total_credits: credits,
                total_tokens: count(tokens_col, TOKENS.name)?,
                serverless_calls,
                compute_calls,
            });
        }

        if negative_credits > 0 {
            return Err(CoreError::NegativeCredits {
                count: negative_credits,
            });
        }

        if blank_credits > 0 {
            warn!(rows = blank_credits, "Excluding function rows with blank credits");
            report.rows_excluded += blank_credits;
            report.add_warning(
                "functions",
                format!("Excluded {} rows with blank credits", blank_credits),
            );
        }

        Ok(records)
    }
}
