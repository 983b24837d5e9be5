//! Function and model cost analysis
//!
//! Rolls function/model usage rows up four ways: an overview, spend per
//! function, a model comparison, and a function x model breakdown. Daily rows
//! additionally feed a per-function trend.

use super::safe_ratio;
use crate::models::FunctionUsageRecord;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Headline numbers across every function
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionOverview {
    pub functions_used: usize,
    /// Distinct non-empty model names
    pub models_used: usize,
    pub total_calls: u64,
    pub total_credits: f64,
    pub total_cost: f64,
}

/// Spend of one function across all models
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpend {
    pub function_name: String,
    pub calls: u64,
    pub credits: f64,
    pub cost: f64,
    pub tokens: u64,
    pub serverless_calls: u64,
    pub compute_calls: u64,
}

/// Spend of one model across the functions that used it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpend {
    pub model_name: String,
    pub functions_used: usize,
    pub total_calls: u64,
    pub total_credits: f64,
    pub cost: f64,
    pub total_tokens: u64,
    pub avg_credits_per_call: f64,
    /// USD per million tokens, 0 without tokens
    pub cost_per_million_tokens: f64,
    /// Median credits of the model's rows
    pub median_credits: f64,
    /// 90th percentile credits of the model's rows
    pub p90_credits: f64,
}

/// One function/model cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionModelRow {
    pub function_name: String,
    pub model_name: Option<String>,
    pub calls: u64,
    pub credits: f64,
    pub cost: f64,
    pub tokens: u64,
    pub cost_per_million_tokens: f64,
    pub avg_tokens_per_call: f64,
    pub serverless_calls: u64,
    pub compute_calls: u64,
}

/// Credits of one function on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFunctionPoint {
    pub date: NaiveDate,
    pub function_name: String,
    pub credits: f64,
    pub tokens: u64,
}

/// Everything the `functions` view shows
#[derive(Debug, Clone, Serialize)]
pub struct FunctionAnalysis {
    pub overview: FunctionOverview,
    pub top_functions: Vec<FunctionSpend>,
    pub models: Vec<ModelSpend>,
    pub breakdown: Vec<FunctionModelRow>,
    pub daily_trend: Vec<DailyFunctionPoint>,
}

impl FunctionAnalysis {
    pub fn is_empty(&self) -> bool {
        self.overview.functions_used == 0
    }
}

#[derive(Default)]
struct Totals {
    calls: u64,
    credits: f64,
    tokens: u64,
    serverless: u64,
    compute: u64,
}

impl Totals {
    fn add(&mut self, record: &FunctionUsageRecord) {
        self.calls += record.call_count;
        self.credits += record.total_credits;
        self.tokens += record.total_tokens;
        self.serverless += record.serverless_calls;
        self.compute += record.compute_calls;
    }
}

/// USD per million tokens
fn per_million_tokens(credits: f64, tokens: u64, credit_cost: f64) -> f64 {
    safe_ratio(credits * credit_cost * 1_000_000.0, tokens as f64)
}

/// Linear-interpolated percentile of an ascending slice, `q` in `[0, 1]`
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
        }
    }
}

fn by_credits_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.total_cmp(&a)
}

pub fn function_overview(records: &[FunctionUsageRecord], credit_cost: f64) -> FunctionOverview {
    let functions: BTreeSet<&str> = records.iter().map(|r| r.function_name.as_str()).collect();
    let models: BTreeSet<&str> = records.iter().filter_map(|r| r.model_name.as_deref()).collect();
    let total_credits = records.iter().map(|r| r.total_credits).sum::<f64>();

    FunctionOverview {
        functions_used: functions.len(),
        models_used: models.len(),
        total_calls: records.iter().map(|r| r.call_count).sum(),
        total_credits,
        total_cost: total_credits * credit_cost,
    }
}

/// Functions ranked by credits, descending, keeping the first `top`
pub fn top_functions(records: &[FunctionUsageRecord], credit_cost: f64, top: usize) -> Vec<FunctionSpend> {
    let mut by_function: HashMap<&str, Totals> = HashMap::new();
    for record in records {
        by_function
            .entry(record.function_name.as_str())
            .or_default()
            .add(record);
    }

    let mut functions: Vec<FunctionSpend> = by_function
        .into_iter()
        .map(|(name, t)| FunctionSpend {
            function_name: name.to_string(),
            calls: t.calls,
            credits: t.credits,
            cost: t.credits * credit_cost,
            tokens: t.tokens,
            serverless_calls: t.serverless,
            compute_calls: t.compute,
        })
        .collect();

    functions.sort_by(|a, b| {
        by_credits_desc(a.credits, b.credits).then_with(|| a.function_name.cmp(&b.function_name))
    });
    functions.truncate(top);
    functions
}

/// Models ranked by credits; rows without a model are left out
pub fn compare_models(records: &[FunctionUsageRecord], credit_cost: f64) -> Vec<ModelSpend> {
    let mut by_model: HashMap<&str, (Totals, BTreeSet<&str>, Vec<f64>)> = HashMap::new();
    for record in records {
        let Some(model) = record.model_name.as_deref() else {
            continue;
        };
        let entry = by_model.entry(model).or_default();
        entry.0.add(record);
        entry.1.insert(record.function_name.as_str());
        entry.2.push(record.total_credits);
    }

    let mut models: Vec<ModelSpend> = by_model
        .into_iter()
        .map(|(model, (t, functions, mut credits))| {
            credits.sort_by(f64::total_cmp);
            ModelSpend {
                model_name: model.to_string(),
                functions_used: functions.len(),
                total_calls: t.calls,
                total_credits: t.credits,
                cost: t.credits * credit_cost,
                total_tokens: t.tokens,
                avg_credits_per_call: safe_ratio(t.credits, t.calls as f64),
                cost_per_million_tokens: per_million_tokens(t.credits, t.tokens, credit_cost),
                median_credits: percentile(&credits, 0.5),
                p90_credits: percentile(&credits, 0.9),
            }
        })
        .collect();

    models.sort_by(|a, b| {
        by_credits_desc(a.total_credits, b.total_credits).then_with(|| a.model_name.cmp(&b.model_name))
    });
    models
}

/// Every function/model pair, ranked by credits
pub fn function_model_breakdown(records: &[FunctionUsageRecord], credit_cost: f64) -> Vec<FunctionModelRow> {
    let mut cells: HashMap<(&str, Option<&str>), Totals> = HashMap::new();
    for record in records {
        cells
            .entry((record.function_name.as_str(), record.model_name.as_deref()))
            .or_default()
            .add(record);
    }

    let mut rows: Vec<FunctionModelRow> = cells
        .into_iter()
        .map(|((function, model), t)| FunctionModelRow {
            function_name: function.to_string(),
            model_name: model.map(str::to_string),
            calls: t.calls,
            credits: t.credits,
            cost: t.credits * credit_cost,
            tokens: t.tokens,
            cost_per_million_tokens: per_million_tokens(t.credits, t.tokens, credit_cost),
            avg_tokens_per_call: safe_ratio(t.tokens as f64, t.calls as f64),
            serverless_calls: t.serverless,
            compute_calls: t.compute,
        })
        .collect();

    rows.sort_by(|a, b| {
        by_credits_desc(a.credits, b.credits)
            .then_with(|| a.function_name.cmp(&b.function_name))
            .then_with(|| a.model_name.cmp(&b.model_name))
    });
    rows
}

/// Daily credits per function over the trailing `days` days
///
/// The window ends at `as_of`, or at the latest dated row when `None`, and
/// keeps dates `>= end - days`. Undated rows are ignored. Points are ordered
/// by date, then function.
pub fn daily_function_trend(
    records: &[FunctionUsageRecord],
    days: u32,
    as_of: Option<NaiveDate>,
) -> Vec<DailyFunctionPoint> {
    let Some(end) = as_of.or_else(|| records.iter().filter_map(|r| r.date).max()) else {
        return Vec::new();
    };
    let start = end - Duration::days(i64::from(days));

    let mut points: BTreeMap<(NaiveDate, &str), (f64, u64)> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date.filter(|d| *d >= start && *d <= end) else {
            continue;
        };
        let entry = points.entry((date, record.function_name.as_str())).or_default();
        entry.0 += record.total_credits;
        entry.1 += record.total_tokens;
    }

    points
        .into_iter()
        .map(|((date, function), (credits, tokens))| DailyFunctionPoint {
            date,
            function_name: function.to_string(),
            credits,
            tokens,
        })
        .collect()
}

/// Full analysis in one pass over the extract
pub fn analyze_functions(
    records: &[FunctionUsageRecord],
    credit_cost: f64,
    top: usize,
    trend_days: u32,
    as_of: Option<NaiveDate>,
) -> FunctionAnalysis {
    let analysis = FunctionAnalysis {
        overview: function_overview(records, credit_cost),
        top_functions: top_functions(records, credit_cost, top),
        models: compare_models(records, credit_cost),
        breakdown: function_model_breakdown(records, credit_cost),
        daily_trend: daily_function_trend(records, trend_days, as_of),
    };

    tracing::debug!(
        functions = analysis.overview.functions_used,
        models = analysis.overview.models_used,
        trend_points = analysis.daily_trend.len(),
        "Function analysis computed"
    );
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn records() -> Vec<FunctionUsageRecord> {
        vec![
            FunctionUsageRecord::new("AI_COMPLETE", Some("llama3.1-70b"), 100, 6.0, 2_000_000).on(d(1)),
            FunctionUsageRecord::new("AI_COMPLETE", Some("mistral-large2"), 50, 2.0, 500_000).on(d(1)),
            FunctionUsageRecord::new("AI_COMPLETE", Some("llama3.1-70b"), 20, 1.0, 500_000).on(d(2)),
            FunctionUsageRecord::new("AI_SUMMARIZE_AGG", Some("llama3.1-70b"), 10, 3.0, 0).on(d(2)),
            FunctionUsageRecord::new("AI_CLASSIFY", None, 40, 0.5, 10_000).on(d(3)),
        ]
    }

    #[test]
    fn test_overview_counts_distinct() {
        let overview = function_overview(&records(), 3.0);
        assert_eq!(overview.functions_used, 3);
        assert_eq!(overview.models_used, 2);
        assert_eq!(overview.total_calls, 220);
        assert!((overview.total_credits - 12.5).abs() < 1e-9);
        assert!((overview.total_cost - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_functions_ranked_and_truncated() {
        let top = top_functions(&records(), 2.0, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].function_name, "AI_COMPLETE");
        assert_eq!(top[0].calls, 170);
        assert!((top[0].credits - 9.0).abs() < 1e-9);
        assert!((top[0].cost - 18.0).abs() < 1e-9);
        assert_eq!(top[1].function_name, "AI_SUMMARIZE_AGG");
    }

    #[test]
    fn test_model_comparison() {
        let models = compare_models(&records(), 3.0);
        assert_eq!(models.len(), 2);

        let llama = &models[0];
        assert_eq!(llama.model_name, "llama3.1-70b");
        assert_eq!(llama.functions_used, 2);
        assert_eq!(llama.total_calls, 130);
        assert!((llama.total_credits - 10.0).abs() < 1e-9);
        assert!((llama.avg_credits_per_call - 10.0 / 130.0).abs() < 1e-12);
        // 10 credits * $3 over 2.5M tokens
        assert!((llama.cost_per_million_tokens - 12.0).abs() < 1e-9);
        assert!((llama.median_credits - 3.0).abs() < 1e-9);
        // rows [1, 3, 6]: 0.9 * 2 = 1.8 -> 3 + 0.8 * 3
        assert!((llama.p90_credits - 5.4).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_keeps_model_less_cells() {
        let rows = function_model_breakdown(&records(), 1.0);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].function_name, "AI_COMPLETE");
        assert_eq!(rows[0].model_name.as_deref(), Some("llama3.1-70b"));
        assert_eq!(rows[0].calls, 120);
        assert!((rows[0].avg_tokens_per_call - 2_500_000.0 / 120.0).abs() < 1e-9);

        let classify = rows.iter().find(|r| r.model_name.is_none()).unwrap();
        assert_eq!(classify.function_name, "AI_CLASSIFY");

        let summarize = rows.iter().find(|r| r.function_name == "AI_SUMMARIZE_AGG").unwrap();
        assert_eq!(summarize.cost_per_million_tokens, 0.0);
    }

    #[test]
    fn test_daily_trend_window() {
        let trend = daily_function_trend(&records(), 1, None);
        // window ends at 2025-03-03 and starts at 2025-03-02
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].date, d(2));
        assert_eq!(trend[0].function_name, "AI_COMPLETE");
        assert_eq!(trend[2].date, d(3));

        let all = daily_function_trend(&records(), 30, Some(d(3)));
        let first_day: Vec<_> = all.iter().filter(|p| p.date == d(1)).collect();
        assert_eq!(first_day.len(), 1);
        assert!((first_day[0].credits - 8.0).abs() < 1e-9);
        assert_eq!(first_day[0].tokens, 2_500_000);

        let undated = vec![FunctionUsageRecord::new("AI_FILTER", None, 1, 1.0, 1)];
        assert!(daily_function_trend(&undated, 30, None).is_empty());
    }

    #[test]
    fn test_empty_analysis() {
        let analysis = analyze_functions(&[], 3.0, 10, 30, None);
        assert!(analysis.is_empty());
        assert!(analysis.models.is_empty());
        assert_eq!(analysis.overview.total_cost, 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[4.0], 0.9), 4.0);
        assert!((percentile(&[1.0, 2.0, 3.0, 4.0], 0.5) - 2.5).abs() < 1e-12);
    }
}
