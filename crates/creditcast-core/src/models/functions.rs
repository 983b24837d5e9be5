//! Per-function, per-model usage rows for AI SQL functions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Credits and tokens of one function/model pair, optionally on one day
///
/// Summary extracts carry no date; daily extracts do. A function called
/// without a model (classification, sentiment) has `model_name == None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionUsageRecord {
    pub date: Option<NaiveDate>,
    pub function_name: String,
    pub model_name: Option<String>,
    pub call_count: u64,
    pub total_credits: f64,
    pub total_tokens: u64,
    pub serverless_calls: u64,
    pub compute_calls: u64,
}

impl FunctionUsageRecord {
    /// Undated record with the call count split as serverless
    pub fn new(function_name: &str, model_name: Option<&str>, calls: u64, credits: f64, tokens: u64) -> Self {
        Self {
            date: None,
            function_name: function_name.to_string(),
            model_name: model_name.map(str::to_string),
            call_count: calls,
            total_credits: credits,
            total_tokens: tokens,
            serverless_calls: calls,
            compute_calls: 0,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Function names the usage views track
pub const TRACKED_FUNCTIONS: &[&str] = &[
    "AI_COMPLETE",
    "COMPLETE",
    "AI_CLASSIFY",
    "AI_FILTER",
    "AI_AGG",
    "AI_EMBED",
    "EMBED_TEXT",
    "EMBED_IMAGE",
    "AI_EXTRACT",
    "AI_SENTIMENT",
    "AI_SUMMARIZE_AGG",
    "AI_TRANSCRIBE",
];
