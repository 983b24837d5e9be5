//! Error types for creditcast-core
//!
//! Two families live here: `CoreError` for conditions a caller must branch on
//! (the fatal projection inputs plus ingestion failures), and `LoadReport` for
//! the non-fatal findings collected while reading an extract.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for creditcast operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Projection Errors
    // ===================
    #[error("Invalid monthly growth rate {rate}: must be greater than -1.0")]
    InvalidGrowthRate { rate: f64 },

    #[error("Projection horizon of {months} months is out of range (maximum {max})")]
    InvalidHorizon { months: u32, max: u32 },

    #[error("Not enough data for a trend forecast: {points} daily points, need at least {required}")]
    InsufficientTrendData { points: usize, required: usize },

    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    // ===================
    // Ingestion Errors
    // ===================
    #[error("Failed to parse CSV: {message}")]
    CsvParse {
        message: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Invalid date '{value}' on line {line} (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },

    #[error("Invalid number '{value}' in column {column} on line {line}")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },

    #[error("Found {count} rows with negative credits; credits must be >= 0")]
    NegativeCredits { count: usize },

    #[error("CSV contains no data rows")]
    EmptyFile,

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        message: String,
        #[source]
        source: toml::de::Error,
    },
}

impl From<csv::Error> for CoreError {
    fn from(source: csv::Error) -> Self {
        CoreError::CsvParse {
            message: source.to_string(),
            source,
        }
    }
}

/// Severity level for findings during load
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational or degraded, data still usable
    Warning,
    /// Significant but not fatal
    Error,
    /// Cannot continue
    Fatal,
}

/// Individual entry in a load report
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
            suggestion: None,
        }
    }

    pub fn fatal(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Fatal,
            suggestion: None,
        }
    }

    /// Add an actionable suggestion to this entry
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create user-friendly entry from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let suggestion = match error {
            CoreError::FileNotFound { path } => {
                Some(format!("Check the path exists: ls {}", path.display()))
            }
            CoreError::FileRead { path, .. } => {
                Some(format!("Check permissions: chmod +r {}", path.display()))
            }
            CoreError::MissingColumns { .. } => Some(
                "Expected columns: DATE, SERVICE_TYPE, DAILY_UNIQUE_USERS, TOTAL_OPERATIONS, TOTAL_CREDITS"
                    .to_string(),
            ),
            CoreError::InvalidDate { .. } => {
                Some("Expected format: YYYY-MM-DD (e.g., 2025-01-05)".to_string())
            }
            CoreError::CsvParse { .. } => {
                Some("Ensure the file is valid CSV with a header row".to_string())
            }
            CoreError::InsufficientTrendData { required, .. } => Some(format!(
                "Collect at least {} days of usage before forecasting",
                required
            )),
            _ => None,
        };

        Self {
            source,
            message: error.to_string(),
            severity: ErrorSeverity::Error,
            suggestion,
        }
    }
}

/// Report of findings encountered while loading an extract
///
/// Tracks partial problems instead of failing completely, so a planning
/// report can still be produced from the usable rows.
#[derive(Debug, Default, serde::Serialize)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub rows_read: usize,
    pub rows_excluded: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    pub fn add_fatal(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::fatal(source, message));
    }

    /// Returns true if there are any fatal errors
    pub fn has_fatal_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == ErrorSeverity::Fatal)
    }

    /// Returns true if there are any entries (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }

    /// Returns count by severity
    pub fn error_count(&self) -> (usize, usize, usize) {
        let count = |severity: ErrorSeverity| self.errors.iter().filter(|e| e.severity == severity).count();
        (
            count(ErrorSeverity::Warning),
            count(ErrorSeverity::Error),
            count(ErrorSeverity::Fatal),
        )
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: LoadReport) {
        self.errors.extend(other.errors);
        self.rows_read += other.rows_read;
        self.rows_excluded += other.rows_excluded;
    }
}
