//! ML forecast extract parser

use super::{field, line_of, open_error, parse_date, parse_optional_f64};
use super::{ColumnMap, ColumnSpec};
use crate::error::{CoreError, LoadReport};
use crate::models::ForecastRow;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const REQUIRED: [ColumnSpec; 3] = [
    ColumnSpec::with_alternates("SERVICE_TYPE", &["SERVICE"]),
    ColumnSpec::new("FORECAST_DATE"),
    ColumnSpec::new("FORECAST_CREDITS"),
];

const LOWER: ColumnSpec = ColumnSpec::new("LOWER_BOUND_CREDITS");
const UPPER: ColumnSpec = ColumnSpec::new("UPPER_BOUND_CREDITS");

/// Parser for `SERVICE_TYPE, FORECAST_DATE, FORECAST_CREDITS, LOWER_BOUND_CREDITS, UPPER_BOUND_CREDITS`
///
/// Missing bound columns collapse the band onto the point forecast. An empty
/// extract is not an error: it simply yields no rows.
#[derive(Default)]
pub struct ForecastCsvParser;

impl ForecastCsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file(&self, path: &Path, report: &mut LoadReport) -> Result<Vec<ForecastRow>, CoreError> {
        let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;
        self.parse_reader(file, report)
    }

    pub fn parse_str(&self, content: &str, report: &mut LoadReport) -> Result<Vec<ForecastRow>, CoreError> {
        self.parse_reader(content.as_bytes(), report)
    }

    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        report: &mut LoadReport,
    ) -> Result<Vec<ForecastRow>, CoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let columns = ColumnMap::from_headers(&headers);
        let positions = columns.require(&REQUIRED)?;
        let lower_col = columns.find(&LOWER);
        let upper_col = columns.find(&UPPER);

        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for result in csv_reader.records() {
            let record = result?;
            report.rows_read += 1;
            let line = line_of(&record);

            let Some(forecast) =
                parse_optional_f64(field(&record, positions[2]), line, "FORECAST_CREDITS")?
            else {
                skipped += 1;
                continue;
            };

            let bound = |pos: Option<usize>, name: &str| -> Result<f64, CoreError> {
                Ok(match pos {
                    Some(p) => parse_optional_f64(field(&record, p), line, name)?.unwrap_or(forecast),
                    None => forecast,
                })
            };

            rows.push(ForecastRow {
                service: field(&record, positions[0]).to_string(),
                forecast_date: parse_date(field(&record, positions[1]), line)?,
                forecast_credits: forecast,
                lower_bound_credits: bound(lower_col, LOWER.name)?,
                upper_bound_credits: bound(upper_col, UPPER.name)?,
            });
        }

        if skipped > 0 {
            report.rows_excluded += skipped;
            report.add_warning(
                "forecast",
                format!("Skipped {} forecast rows with no FORECAST_CREDITS", skipped),
            );
        }

        rows.sort_by(|a, b| {
            a.forecast_date
                .cmp(&b.forecast_date)
                .then_with(|| a.service.cmp(&b.service))
        });
        debug!(rows = rows.len(), "Forecast CSV parsed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast_rows_sorted_by_date() {
        let csv = "SERVICE_TYPE,FORECAST_DATE,FORECAST_CREDITS,LOWER_BOUND_CREDITS,UPPER_BOUND_CREDITS\n\
                   Cortex Search,2025-03-02,5,4,6\n\
                   Cortex Search,2025-03-01,4,3,5\n";
        let mut report = LoadReport::new();
        let rows = ForecastCsvParser::new().parse_str(csv, &mut report).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].forecast_credits, 4.0);
        assert_eq!(rows[0].lower_bound_credits, 3.0);
        assert_eq!(rows[1].upper_bound_credits, 6.0);
    }

    #[test]
    fn test_missing_bounds_collapse_to_forecast() {
        let csv = "service,forecast_date,forecast_credits\nCortex Analyst,2025-03-01,7.5\n";
        let mut report = LoadReport::new();
        let rows = ForecastCsvParser::new().parse_str(csv, &mut report).unwrap();

        assert_eq!(rows[0].lower_bound_credits, 7.5);
        assert_eq!(rows[0].upper_bound_credits, 7.5);
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        let mut report = LoadReport::new();
        assert!(ForecastCsvParser::new().parse_str("", &mut report).unwrap().is_empty());
        assert!(ForecastCsvParser::new()
            .parse_str("SERVICE_TYPE,FORECAST_DATE,FORECAST_CREDITS\n", &mut report)
            .unwrap()
            .is_empty());
    }
}
