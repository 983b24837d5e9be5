//! creditcast-core - Core library for creditcast
//!
//! Turns a sample of daily per-service usage into a data-maturity verdict,
//! confidence-banded cost projections, and a plain-text budget proposal.

pub mod analytics;
pub mod error;
pub mod export;
pub mod models;
pub mod parsers;
pub mod report;
pub mod source;

pub use analytics::Snapshot;
pub use error::{CoreError, ErrorSeverity, LoadError, LoadReport};
pub use export::{
    export_bundle, export_function_breakdown_csv, export_json, export_proposal_text,
    export_summary_csv, export_usage_csv, function_breakdown_path,
};
pub use models::{EstimatorConfig, ForecastRow, FunctionUsageRecord, UsageRecord, UsageSample};
pub use report::{assemble_report, ProjectionResult, Report};
pub use source::{CsvForecastSource, CsvUsageSource, FetchCache, FetchOutcome, TwoStageFetch, UsageSource};
