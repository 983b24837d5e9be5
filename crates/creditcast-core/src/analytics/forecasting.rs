//! Monthly credit forecasts
//!
//! An external ML forecast is preferred when it has rows inside the requested
//! horizon. Otherwise a least-squares line is fitted on daily totals and
//! extrapolated, with R² reported so callers can judge the fit.

use crate::error::CoreError;
use crate::models::{ForecastRow, UsageSample};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fewer daily points than this and the linear fallback refuses
pub const MIN_TREND_POINTS: usize = 7;

/// Average month length used to turn months into a day horizon
pub const DAYS_PER_MONTH: f64 = 30.5;

/// Longest horizon any projection accepts
pub const MAX_PROJECTION_MONTHS: u32 = 120;

/// Reject horizons beyond `MAX_PROJECTION_MONTHS`
pub fn check_horizon(months: u32) -> Result<(), CoreError> {
    if months > MAX_PROJECTION_MONTHS {
        return Err(CoreError::InvalidHorizon {
            months,
            max: MAX_PROJECTION_MONTHS,
        });
    }
    Ok(())
}

/// Horizon in days for a number of months: `round(months * 30.5)`
pub fn projection_days(months: u32) -> i64 {
    (f64::from(months) * DAYS_PER_MONTH).round() as i64
}

/// First day of the date's calendar month
fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// One calendar month of forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyForecast {
    /// First day of the month
    pub month: NaiveDate,
    pub credits: f64,
    pub cost: f64,
    /// Only present for ML forecasts
    pub lower_credits: Option<f64>,
    pub upper_credits: Option<f64>,
    pub lower_cost: Option<f64>,
    pub upper_cost: Option<f64>,
}

/// One calendar month of ML forecast for a single service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceMonthForecast {
    pub month: NaiveDate,
    pub service: String,
    pub credits: f64,
    pub lower_credits: f64,
    pub upper_credits: f64,
}

/// Trend direction with percentage change over 30 days
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TrendDirection {
    /// Increasing trend (percentage)
    Up(f64),
    /// Decreasing trend (percentage)
    Down(f64),
    /// Stable trend (<1% of intercept per day)
    Stable,
}

/// Least-squares fit of daily totals against their index
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination (0.0-1.0)
    pub r_squared: f64,
    /// Number of daily points fitted
    pub points: usize,
    pub direction: TrendDirection,
}

/// Linear fallback result
#[derive(Debug, Clone, Serialize)]
pub struct LinearForecast {
    pub fit: LinearFit,
    pub months: Vec<MonthlyForecast>,
    pub total_credits: f64,
    pub total_cost: f64,
}

/// Rolled-up ML forecast
#[derive(Debug, Clone, Serialize)]
pub struct MlForecast {
    pub months: Vec<MonthlyForecast>,
    pub by_service: Vec<ServiceMonthForecast>,
    pub total_credits: f64,
    pub total_cost: f64,
}

/// Where a monthly forecast came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastSource {
    Ml,
    LinearFallback,
}

/// Forecast chosen by `plan_forecast`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source")]
pub enum ForecastPlan {
    Ml(MlForecast),
    LinearFallback(LinearForecast),
}

impl ForecastPlan {
    pub fn source(&self) -> ForecastSource {
        match self {
            Self::Ml(_) => ForecastSource::Ml,
            Self::LinearFallback(_) => ForecastSource::LinearFallback,
        }
    }

    pub fn months(&self) -> &[MonthlyForecast] {
        match self {
            Self::Ml(f) => &f.months,
            Self::LinearFallback(f) => &f.months,
        }
    }

    pub fn total_credits(&self) -> f64 {
        match self {
            Self::Ml(f) => f.total_credits,
            Self::LinearFallback(f) => f.total_credits,
        }
    }

    pub fn total_cost(&self) -> f64 {
        match self {
            Self::Ml(f) => f.total_cost,
            Self::LinearFallback(f) => f.total_cost,
        }
    }
}

/// Linear trend extrapolation of daily total credits
///
/// Daily totals are indexed `0..n` in date order; gaps in dates are not
/// weighted. Extrapolated values are floored at zero and summed per calendar
/// month of the extrapolated date.
///
/// # Errors
/// `InsufficientTrendData` when fewer than 7 distinct daily points exist.
pub fn linear_fallback(
    sample: &UsageSample,
    months: u32,
    credit_cost: f64,
) -> Result<LinearForecast, CoreError> {
    check_horizon(months)?;
    let daily = sample.daily_totals();
    if daily.len() < MIN_TREND_POINTS {
        tracing::info!(
            points = daily.len(),
            required = MIN_TREND_POINTS,
            "Refusing linear forecast"
        );
        return Err(CoreError::InsufficientTrendData {
            points: daily.len(),
            required: MIN_TREND_POINTS,
        });
    }

    let points: Vec<(f64, f64)> = daily
        .iter()
        .enumerate()
        .map(|(i, &(_, credits))| (i as f64, credits))
        .collect();
    let (slope, intercept, r_squared) = linear_regression(&points);

    let n = points.len() as i64;
    let Some(&(last_date, _)) = daily.last() else {
        return Err(CoreError::InsufficientTrendData {
            points: 0,
            required: MIN_TREND_POINTS,
        });
    };

    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for k in 0..projection_days(months) {
        let date = last_date + Duration::days(k + 1);
        let x = (n + k) as f64;
        let y = (intercept + slope * x).max(0.0);
        *buckets.entry(month_start(date)).or_default() += y;
    }

    let months: Vec<MonthlyForecast> = buckets
        .into_iter()
        .map(|(month, credits)| MonthlyForecast {
            month,
            credits,
            cost: credits * credit_cost,
            lower_credits: None,
            upper_credits: None,
            lower_cost: None,
            upper_cost: None,
        })
        .collect();

    let total_credits = months.iter().map(|m| m.credits).sum::<f64>();

    Ok(LinearForecast {
        fit: LinearFit {
            slope,
            intercept,
            r_squared: r_squared.clamp(0.0, 1.0),
            points: points.len(),
            direction: trend_direction(slope, intercept),
        },
        months,
        total_credits,
        total_cost: total_credits * credit_cost,
    })
}

/// Roll ML forecast rows up into calendar months
///
/// Rows are restricted to `[first date, first date + round(months * 30.5))`.
/// Returns `None` when nothing remains or the horizon is out of range, which
/// callers treat as "no forecast".
pub fn rollup_ml_forecast(rows: &[ForecastRow], months: u32, credit_cost: f64) -> Option<MlForecast> {
    check_horizon(months).ok()?;
    let start = rows.iter().map(|r| r.forecast_date).min()?;
    let end = start.checked_add_signed(Duration::days(projection_days(months)))?;

    let mut per_service: BTreeMap<(NaiveDate, &str), (f64, f64, f64)> = BTreeMap::new();
    for row in rows
        .iter()
        .filter(|r| r.forecast_date >= start && r.forecast_date < end)
    {
        let entry = per_service
            .entry((month_start(row.forecast_date), row.service.as_str()))
            .or_default();
        entry.0 += row.forecast_credits;
        entry.1 += row.lower_bound_credits;
        entry.2 += row.upper_bound_credits;
    }

    if per_service.is_empty() {
        return None;
    }

    let mut totals: BTreeMap<NaiveDate, (f64, f64, f64)> = BTreeMap::new();
    for (&(month, _), &(credits, lower, upper)) in &per_service {
        let entry = totals.entry(month).or_default();
        entry.0 += credits;
        entry.1 += lower;
        entry.2 += upper;
    }

    let by_service = per_service
        .into_iter()
        .map(|((month, service), (credits, lower, upper))| ServiceMonthForecast {
            month,
            service: service.to_string(),
            credits,
            lower_credits: lower,
            upper_credits: upper,
        })
        .collect();

    let months: Vec<MonthlyForecast> = totals
        .into_iter()
        .map(|(month, (credits, lower, upper))| MonthlyForecast {
            month,
            credits,
            cost: credits * credit_cost,
            lower_credits: Some(lower),
            upper_credits: Some(upper),
            lower_cost: Some(lower * credit_cost),
            upper_cost: Some(upper * credit_cost),
        })
        .collect();

    let total_credits = months.iter().map(|m| m.credits).sum::<f64>();

    Some(MlForecast {
        months,
        by_service,
        total_credits,
        total_cost: total_credits * credit_cost,
    })
}

/// Choose the ML forecast when it has rows in range, else the linear fallback
pub fn plan_forecast(
    ml_rows: Option<&[ForecastRow]>,
    sample: &UsageSample,
    months: u32,
    credit_cost: f64,
) -> Result<ForecastPlan, CoreError> {
    check_horizon(months)?;
    if let Some(ml) = ml_rows.and_then(|rows| rollup_ml_forecast(rows, months, credit_cost)) {
        return Ok(ForecastPlan::Ml(ml));
    }

    tracing::info!("ML forecast unavailable or empty, using linear trend fallback");
    linear_fallback(sample, months, credit_cost).map(ForecastPlan::LinearFallback)
}

fn trend_direction(slope: f64, intercept: f64) -> TrendDirection {
    if slope == 0.0 || slope.abs() < 0.01 * intercept.abs() {
        TrendDirection::Stable
    } else {
        let base = intercept.abs().max(f64::EPSILON);
        let pct = (slope * 30.0 / base * 100.0).abs();
        if slope > 0.0 {
            TrendDirection::Up(pct)
        } else {
            TrendDirection::Down(pct)
        }
    }
}

/// Simple linear regression with R² calculation
///
/// # Returns
/// (slope, intercept, r_squared)
fn linear_regression(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.0).sum();
    let sum_y: f64 = points.iter().map(|p| p.1).sum();
    let sum_xx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator != 0.0 {
        (n * sum_xy - sum_x * sum_y) / denominator
    } else {
        0.0
    };
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (slope * p.0 + intercept)).powi(2))
        .sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - (ss_res / ss_tot)
    } else {
        0.0
    };

    (slope, intercept, r_squared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageRecord;

    fn daily_sample(start: NaiveDate, values: &[f64]) -> UsageSample {
        UsageSample::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    UsageRecord::new(start + Duration::days(i as i64), "Cortex Search", v, 1.0, 1)
                })
                .collect(),
        )
    }

    fn ml_row(date: NaiveDate, service: &str, credits: f64) -> ForecastRow {
        ForecastRow {
            service: service.to_string(),
            forecast_date: date,
            forecast_credits: credits,
            lower_bound_credits: credits * 0.8,
            upper_bound_credits: credits * 1.2,
        }
    }

    #[test]
    fn test_projection_days_rounds() {
        assert_eq!(projection_days(12), 366);
        assert_eq!(projection_days(1), 31);
        assert_eq!(projection_days(3), 92);
        assert_eq!(projection_days(0), 0);
    }

    #[test]
    fn test_horizon_limit() {
        assert!(check_horizon(MAX_PROJECTION_MONTHS).is_ok());
        assert!(matches!(
            check_horizon(u32::MAX),
            Err(CoreError::InvalidHorizon { .. })
        ));

        let rows = vec![ml_row(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), "Cortex Search", 5.0)];
        assert!(rollup_ml_forecast(&rows, u32::MAX, 3.0).is_none());
        assert!(plan_forecast(Some(rows.as_slice()), &UsageSample::empty(), u32::MAX, 3.0).is_err());
    }

    #[test]
    fn test_linear_regression_perfect_fit() {
        let points: Vec<_> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let (slope, intercept, r2) = linear_regression(&points);
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
        assert!((r2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_refuses_short_series() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let sample = daily_sample(start, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let err = linear_fallback(&sample, 12, 3.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientTrendData {
                points: 6,
                required: 7
            }
        ));
    }

    #[test]
    fn test_fallback_flat_series_buckets_by_calendar_month() {
        // Seven days ending 2025-01-31, flat at 10 credits/day
        let start = NaiveDate::from_ymd_opt(2025, 1, 25).unwrap();
        let sample = daily_sample(start, &[10.0; 7]);
        let forecast = linear_fallback(&sample, 1, 2.0).unwrap();

        // 31 days from Feb 1: 28 in February, 3 in March
        assert_eq!(forecast.months.len(), 2);
        assert_eq!(forecast.months[0].month, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert!((forecast.months[0].credits - 280.0).abs() < 1e-6);
        assert!((forecast.months[1].credits - 30.0).abs() < 1e-6);
        assert!((forecast.total_cost - 620.0).abs() < 1e-6);
        assert_eq!(forecast.fit.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_fallback_floors_at_zero() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let sample = daily_sample(start, &[70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0]);
        let forecast = linear_fallback(&sample, 3, 1.0).unwrap();

        assert!(forecast.months.iter().all(|m| m.credits >= 0.0));
        assert!(forecast.fit.slope < 0.0);
        assert!(matches!(forecast.fit.direction, TrendDirection::Down(_)));
        // x = 7 gives 0, every later value is floored
        assert_eq!(forecast.total_credits, 0.0);
    }

    #[test]
    fn test_ml_rollup_filters_horizon() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let rows = vec![
            ml_row(start, "Cortex Search", 10.0),
            ml_row(start, "Cortex Analyst", 5.0),
            ml_row(start + Duration::days(30), "Cortex Search", 10.0),
            // Outside a 1-month horizon (31 days)
            ml_row(start + Duration::days(31), "Cortex Search", 100.0),
        ];

        let ml = rollup_ml_forecast(&rows, 1, 3.0).unwrap();
        assert_eq!(ml.months.len(), 1);
        assert_eq!(ml.months[0].credits, 25.0);
        assert_eq!(ml.months[0].cost, 75.0);
        assert_eq!(ml.months[0].upper_credits, Some(30.0));
        assert_eq!(ml.by_service.len(), 2);
    }

    #[test]
    fn test_plan_prefers_ml_then_falls_back() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let sample = daily_sample(start, &[5.0; 10]);
        let rows = vec![ml_row(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), "Cortex Search", 1.0)];

        let plan = plan_forecast(Some(rows.as_slice()), &sample, 12, 3.0).unwrap();
        assert_eq!(plan.source(), ForecastSource::Ml);

        let plan = plan_forecast(Some(&[][..]), &sample, 12, 3.0).unwrap();
        assert_eq!(plan.source(), ForecastSource::LinearFallback);

        let plan = plan_forecast(None, &sample, 12, 3.0).unwrap();
        assert_eq!(plan.source(), ForecastSource::LinearFallback);
        assert_eq!(plan.months().len(), 13);
    }
}
