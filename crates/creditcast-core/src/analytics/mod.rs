//! Projection and data-maturity engine
//!
//! Pure, synchronous functions over an immutable `UsageSample`. Data flows one
//! way: sample -> maturity -> (confidence score) -> interval, growth, scaling
//! -> report. No function here keeps state between calls.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::UsageSample;

pub mod anomalies;
pub mod forecasting;
pub mod functions;
pub mod growth;
pub mod interval;
pub mod maturity;
pub mod personas;
pub mod rolling;
pub mod scaling;
pub mod summary;

#[cfg(test)]
mod tests;

pub use anomalies::{active_alerts, week_over_week, AlertLevel, WeekOverWeek};
pub use forecasting::{
    check_horizon, linear_fallback, plan_forecast, projection_days, rollup_ml_forecast, ForecastPlan,
    ForecastSource, LinearFit, LinearForecast, MlForecast, MonthlyForecast, ServiceMonthForecast,
    TrendDirection, MAX_PROJECTION_MONTHS, MIN_TREND_POINTS,
};
pub use functions::{
    analyze_functions, compare_models, daily_function_trend, function_model_breakdown,
    function_overview, top_functions, DailyFunctionPoint, FunctionAnalysis, FunctionModelRow,
    FunctionOverview, FunctionSpend, ModelSpend,
};
pub use growth::{project_growth, GrowthProjection, GrowthRow, GrowthScenario, MonthTotal};
pub use interval::{confidence_interval, variance_for_score, ConfidenceInterval};
pub use maturity::{assess_maturity, confidence_score, MaturityAssessment, MaturityLevel};
pub use personas::{
    analyst_rate_check, blended_cost_per_request, estimate_personas, published_cost_per_request,
    service_rates, Persona, PersonaCost, PersonaEstimate, RateAgreement, RateCheck, ServiceRate,
};
pub use rolling::{
    latest_window_totals, rolling_by_service, rolling_mean, rolling_sum, RollingPoint,
    ServiceRolling, WindowTotals,
};
pub use scaling::{
    recommend_budget, scale_to_production, BudgetRecommendation, ScalingProjection,
    ScalingScenario, DEFAULT_BUDGET_BUFFER,
};
pub use summary::{credit_summary, CreditEstimate, RunRateSummary, ServiceCost};

/// `numerator / denominator`, or 0 when the denominator is not positive
///
/// Ratios never surface NaN or infinity to callers.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

/// Current-state estimate every command starts from
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub maturity: MaturityAssessment,
    pub run_rate: RunRateSummary,
    /// Band around the monthly run-rate cost
    pub monthly_interval: ConfidenceInterval,
    /// Band around the annual run-rate cost
    pub annual_interval: ConfidenceInterval,
    pub computed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Assess maturity and run rate, then band both by the confidence score
    ///
    /// Works on an empty sample (all zeros, level `none`).
    pub fn compute(sample: &UsageSample, credit_cost: f64, custom_variance: Option<f64>) -> Self {
        let maturity = assess_maturity(sample);
        let run_rate = RunRateSummary::from_sample(sample, credit_cost);
        let monthly_interval =
            confidence_interval(run_rate.monthly_cost, maturity.confidence_score, custom_variance);
        let annual_interval =
            confidence_interval(run_rate.annual_cost, maturity.confidence_score, custom_variance);

        Self {
            maturity,
            run_rate,
            monthly_interval,
            annual_interval,
            computed_at: Utc::now(),
        }
    }
}
