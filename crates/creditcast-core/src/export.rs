//! Export of proposals, summaries, and raw usage
//!
//! Every writer creates missing parent directories and overwrites the target.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analytics::FunctionModelRow;
use crate::models::UsageSample;
use crate::report::Report;

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write the proposal text
pub fn export_proposal_text(report: &Report, path: &Path) -> Result<()> {
    let mut writer = create_file(path)?;
    writer
        .write_all(report.text.as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .with_context(|| format!("Failed to write proposal: {}", path.display()))?;
    writer.flush().context("Failed to flush proposal writer")?;
    Ok(())
}

/// Write the key/value table as `Metric,Value` CSV
pub fn export_summary_csv(report: &Report, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create_file(path)?);

    writer
        .write_record(["Metric", "Value"])
        .context("Failed to write CSV header")?;
    for (metric, value) in &report.key_values {
        writer
            .write_record([metric, value])
            .with_context(|| format!("Failed to write row for {}", metric))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write the usage sample back out in the extract's column layout
pub fn export_usage_csv(sample: &UsageSample, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create_file(path)?);

    writer
        .write_record([
            "DATE",
            "SERVICE_TYPE",
            "DAILY_UNIQUE_USERS",
            "TOTAL_OPERATIONS",
            "TOTAL_CREDITS",
            "AVG_DAILY_COST_PER_USER",
            "PROJECTED_MONTHLY_COST_PER_USER",
        ])
        .context("Failed to write CSV header")?;

    let optional = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for record in sample.records() {
        writer
            .write_record(&[
                record.date.format("%Y-%m-%d").to_string(),
                record.service.clone(),
                record.daily_unique_users.to_string(),
                record.total_operations.to_string(),
                record.total_credits.to_string(),
                optional(record.avg_daily_cost_per_user),
                optional(record.projected_monthly_cost_per_user),
            ])
            .with_context(|| format!("Failed to write row for {} {}", record.date, record.service))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// `aisql_function_analysis_YYYYMMDD.csv` inside `dir`
pub fn function_breakdown_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("aisql_function_analysis_{}.csv", date.format("%Y%m%d")))
}

/// Write the function x model breakdown, one row per cell
pub fn export_function_breakdown_csv(rows: &[FunctionModelRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create_file(path)?);

    writer
        .write_record([
            "FUNCTION_NAME",
            "MODEL_NAME",
            "CALL_COUNT",
            "TOTAL_CREDITS",
            "COST_USD",
            "TOTAL_TOKENS",
            "COST_PER_MILLION_USD",
            "AVG_TOKENS_PER_CALL",
            "SERVERLESS_CALLS",
            "COMPUTE_CALLS",
        ])
        .context("Failed to write CSV header")?;

    for row in rows {
        writer
            .write_record(&[
                row.function_name.clone(),
                row.model_name.clone().unwrap_or_default(),
                row.calls.to_string(),
                row.credits.to_string(),
                format!("{:.4}", row.cost),
                row.tokens.to_string(),
                format!("{:.2}", row.cost_per_million_tokens),
                format!("{:.0}", row.avg_tokens_per_call),
                row.serverless_calls.to_string(),
                row.compute_calls.to_string(),
            ])
            .with_context(|| format!("Failed to write row for {}", row.function_name))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write any serializable value as pretty JSON
pub fn export_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut writer = create_file(path)?;
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize JSON: {}", path.display()))?;
    writer.write_all(b"\n").context("Failed to write JSON")?;
    writer.flush().context("Failed to flush JSON writer")?;
    Ok(())
}

/// Paths written by `export_bundle`
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub proposal: PathBuf,
    pub summary: PathBuf,
    pub usage: PathBuf,
    pub report_json: PathBuf,
}

impl ExportBundle {
    /// Date-stamped file names inside `dir`
    pub fn in_dir(dir: &Path, date: NaiveDate) -> Self {
        let stamp = date.format("%Y%m%d");
        Self {
            proposal: dir.join(format!("cortex_cost_proposal_{}.txt", stamp)),
            summary: dir.join(format!("cortex_cost_summary_{}.csv", stamp)),
            usage: dir.join(format!("cortex_usage_data_{}.csv", stamp)),
            report_json: dir.join(format!("cortex_cost_report_{}.json", stamp)),
        }
    }
}

/// Write proposal, summary, raw usage, and JSON report into `dir`
pub fn export_bundle(
    report: &Report,
    sample: &UsageSample,
    dir: &Path,
    date: NaiveDate,
) -> Result<ExportBundle> {
    let bundle = ExportBundle::in_dir(dir, date);
    export_proposal_text(report, &bundle.proposal)?;
    export_summary_csv(report, &bundle.summary)?;
    export_usage_csv(sample, &bundle.usage)?;
    export_json(report, &bundle.report_json)?;
    tracing::info!(dir = %dir.display(), "Exported proposal bundle");
    Ok(bundle)
}
