//! Cross-component tests for the projection engine

use super::*;
use crate::models::UsageRecord;
use chrono::{Duration, NaiveDate};

/// Generate a sample of `days` contiguous days for each service
fn generate_sample(days: usize, services: &[(&str, f64, f64, u64)]) -> UsageSample {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut records = Vec::new();
    for day in 0..days {
        for &(service, credits, users, ops) in services {
            records.push(UsageRecord::new(
                start + Duration::days(day as i64),
                service,
                credits,
                users,
                ops,
            ));
        }
    }
    UsageSample::new(records)
}

// ============================================================================
// Empty sample (3 tests)
// ============================================================================

#[test]
fn test_empty_sample_never_fails() {
    let sample = UsageSample::empty();
    let snapshot = Snapshot::compute(&sample, 3.0, None);

    assert_eq!(snapshot.maturity.level, MaturityLevel::None);
    assert_eq!(snapshot.run_rate.monthly_cost, 0.0);
    assert_eq!(snapshot.annual_interval.lower, 0.0);
    assert_eq!(snapshot.annual_interval.upper, 0.0);
    assert!((snapshot.annual_interval.variance_pct - 0.30).abs() < 1e-12);
}

#[test]
fn test_empty_sample_projections_are_empty() {
    let sample = UsageSample::empty();
    assert!(project_growth(&sample, 0.25, 12, 3.0).unwrap().is_empty());
    assert!(rolling_by_service(&sample, 30).is_empty());
    assert!(week_over_week(&sample).is_empty());
    assert!(matches!(
        linear_fallback(&sample, 12, 3.0),
        Err(crate::CoreError::InsufficientTrendData { points: 0, .. })
    ));
}

#[test]
fn test_empty_sample_scaling_finite() {
    let snapshot = Snapshot::compute(&UsageSample::empty(), 3.0, None);
    let projection = scale_to_production(
        snapshot.run_rate.monthly_cost,
        snapshot.run_rate.avg_daily_users,
        ScalingScenario::LightPoc,
    );
    assert_eq!(projection.projected_monthly_cost, 0.0);
    assert_eq!(projection.cost_per_user, 0.0);
}

// ============================================================================
// Insufficient history (2 tests)
// ============================================================================

#[test]
fn test_two_days_not_ready_but_scores() {
    let sample = generate_sample(2, &[("Cortex Analyst", 10.0, 5.0, 100)]);
    let snapshot = Snapshot::compute(&sample, 3.0, None);

    assert!(!snapshot.maturity.ready_for_projection);
    // 2/30*60 + 40 = 44
    assert_eq!(snapshot.maturity.confidence_score, 44);
    assert!(snapshot.run_rate.monthly_cost > 0.0);
}

#[test]
fn test_insufficient_history_calculations_still_finite() {
    let sample = generate_sample(1, &[("Cortex Analyst", 10.0, 0.0, 0)]);
    let projection = project_growth(&sample, 0.5, 3, 3.0).unwrap();
    assert!(projection
        .rows
        .iter()
        .all(|r| r.projected_cost.is_finite() && r.cost_per_user == 0.0));

    let rates = service_rates(&sample, 3.0);
    assert_eq!(rates[0].cost_per_request, 0.0);
}

// ============================================================================
// Pipeline (4 tests)
// ============================================================================

#[test]
fn test_confidence_narrows_band_with_more_data() {
    let short = Snapshot::compute(&generate_sample(5, &[("Cortex Search", 1.0, 1.0, 1)]), 3.0, None);
    let long = Snapshot::compute(&generate_sample(40, &[("Cortex Search", 1.0, 1.0, 1)]), 3.0, None);

    assert!(long.maturity.confidence_score > short.maturity.confidence_score);
    assert!(long.annual_interval.variance_pct < short.annual_interval.variance_pct);
    assert!((long.annual_interval.variance_pct - 0.05).abs() < 1e-12);
}

#[test]
fn test_monthly_baseline_growth_matches_formula() {
    // 30 days at 1000/30 credits a day gives a 1000-credit baseline
    let sample = generate_sample(30, &[("Cortex Analyst", 1000.0 / 30.0, 10.0, 50)]);
    let projection = project_growth(&sample, 0.10, 12, 3.0).unwrap();
    let month_12 = projection.month(12).next().unwrap();

    assert!((month_12.projected_credits - 1000.0 * 1.1f64.powi(12)).abs() < 1e-6);
    assert!((month_12.projected_cost - 9415.3).abs() < 0.1);
}

#[test]
fn test_scaling_from_snapshot_with_budget() {
    let sample = generate_sample(30, &[("Cortex Analyst", 10.0, 4.0, 100), ("Cortex Search", 5.0, 6.0, 50)]);
    let snapshot = Snapshot::compute(&sample, 2.0, None);

    // 15 credits/day * 30 * $2 = $900/month, 5 mean users
    assert!((snapshot.run_rate.monthly_cost - 900.0).abs() < 1e-9);
    assert_eq!(snapshot.run_rate.avg_daily_users, 5.0);

    let projection = scale_to_production(
        snapshot.run_rate.monthly_cost,
        snapshot.run_rate.avg_daily_users,
        ScalingScenario::StandardPoc,
    );
    assert_eq!(projection.projected_users, 50.0);
    assert!((projection.projected_monthly_cost - 10_800.0).abs() < 1e-6);

    let budget = recommend_budget(
        &projection,
        snapshot.maturity.confidence_score,
        None,
        DEFAULT_BUDGET_BUFFER,
    );
    assert!(budget.recommended_annual > budget.annual.upper);
    assert!((budget.recommended_annual - budget.annual.upper * 1.15).abs() < 1e-6);
}

#[test]
fn test_rolling_per_service_no_mixing() {
    let sample = generate_sample(
        6,
        &[("Cortex Analyst", 10.0, 2.0, 10), ("Cortex Search", 1.0, 0.0, 1)],
    );
    let series = rolling_by_service(&sample, 5);

    assert_eq!(series.len(), 2);
    let analyst = &series[0];
    assert_eq!(analyst.points[0].credits_sum, 10.0);
    assert_eq!(analyst.points[4].credits_sum, 50.0);
    assert_eq!(analyst.points[5].credits_sum, 50.0);
    assert_eq!(analyst.points[5].credits_per_user, 25.0);

    // Zero users: ratio is 0, not NaN
    let search = &series[1];
    assert!(search.points.iter().all(|p| p.credits_per_user == 0.0));

    let totals = latest_window_totals(&sample, 5, 2.0);
    assert_eq!(totals.total_credits, 55.0);
    assert_eq!(totals.total_cost, 110.0);
    assert_eq!(totals.avg_users, 1.0);
}

// ============================================================================
// Forecast selection (1 test)
// ============================================================================

#[test]
fn test_forecast_refuses_then_succeeds() {
    let six = generate_sample(6, &[("Cortex Search", 3.0, 1.0, 1)]);
    assert!(plan_forecast(None, &six, 12, 3.0).is_err());

    let seven = generate_sample(7, &[("Cortex Search", 3.0, 1.0, 1)]);
    let plan = plan_forecast(None, &seven, 12, 3.0).unwrap();
    assert_eq!(plan.source(), ForecastSource::LinearFallback);
    // Flat 3 credits/day over 366 days
    assert!((plan.total_credits() - 3.0 * 366.0).abs() < 1e-6);
}
