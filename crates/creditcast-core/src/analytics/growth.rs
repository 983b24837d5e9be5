//! Compound-growth projection of per-service baselines
//!
//! The baseline for a service is the credit total and mean daily users over the
//! whole sample, computed once. Users compound at the same monthly rate as
//! credits.

use super::forecasting::{check_horizon, MAX_PROJECTION_MONTHS};
use super::safe_ratio;
use crate::error::CoreError;
use crate::models::UsageSample;
use serde::Serialize;
use std::collections::BTreeMap;

/// Named monthly growth presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GrowthScenario {
    Conservative,
    Moderate,
    Aggressive,
}

impl GrowthScenario {
    pub const ALL: [GrowthScenario; 3] = [Self::Conservative, Self::Moderate, Self::Aggressive];

    /// Parse a preset name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "conservative" => Some(Self::Conservative),
            "moderate" => Some(Self::Moderate),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }

    /// Monthly growth rate
    pub fn monthly_rate(self) -> f64 {
        match self {
            Self::Conservative => 0.10,
            Self::Moderate => 0.25,
            Self::Aggressive => 0.50,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Conservative => "Conservative (10% monthly)",
            Self::Moderate => "Moderate (25% monthly)",
            Self::Aggressive => "Aggressive (50% monthly)",
        }
    }
}

/// Projection of one service in one future month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    /// 1-based month offset
    pub month: u32,
    pub service: String,
    pub projected_credits: f64,
    pub projected_users: f64,
    pub projected_cost: f64,
    /// 0 when projected users are 0
    pub cost_per_user: f64,
    pub growth_rate: f64,
}

/// Month totals across services
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: u32,
    pub credits: f64,
    pub cost: f64,
    pub users: f64,
}

/// Ordered projection rows: month ascending, then service
#[derive(Debug, Clone, Default, Serialize)]
pub struct GrowthProjection {
    pub rows: Vec<GrowthRow>,
}

impl GrowthProjection {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of a given month
    pub fn month(&self, month: u32) -> impl Iterator<Item = &GrowthRow> {
        self.rows.iter().filter(move |r| r.month == month)
    }

    /// Totals per month, ascending
    pub fn monthly_totals(&self) -> Vec<MonthTotal> {
        let mut totals: BTreeMap<u32, MonthTotal> = BTreeMap::new();
        for row in &self.rows {
            let total = totals.entry(row.month).or_insert(MonthTotal {
                month: row.month,
                credits: 0.0,
                cost: 0.0,
                users: 0.0,
            });
            total.credits += row.projected_credits;
            total.cost += row.projected_cost;
            total.users += row.projected_users;
        }
        totals.into_values().collect()
    }

    /// Sum of projected cost across every month and service
    pub fn total_cost(&self) -> f64 {
        self.rows.iter().map(|r| r.projected_cost).sum()
    }
}

/// Project each service forward `months` months at `growth_rate` per month
///
/// # Errors
/// `InvalidGrowthRate` when `growth_rate <= -1` (or NaN), since `1 + rate`
/// would no longer be a positive factor. `InvalidHorizon` when `months`
/// exceeds `MAX_PROJECTION_MONTHS`.
pub fn project_growth(
    sample: &UsageSample,
    growth_rate: f64,
    months: u32,
    credit_cost: f64,
) -> Result<GrowthProjection, CoreError> {
    if growth_rate.is_nan() || growth_rate <= -1.0 {
        return Err(CoreError::InvalidGrowthRate { rate: growth_rate });
    }
    check_horizon(months)?;

    let baselines = sample.service_totals();
    let mut rows = Vec::with_capacity(baselines.len() * months as usize);

    for month in 1..=months {
        let exponent = i32::try_from(month).map_err(|_| CoreError::InvalidHorizon {
            months,
            max: MAX_PROJECTION_MONTHS,
        })?;
        let factor = (1.0 + growth_rate).powi(exponent);
        for baseline in &baselines {
            let projected_credits = baseline.total_credits * factor;
            let projected_users = baseline.mean_daily_users * factor;
            let projected_cost = projected_credits * credit_cost;

            rows.push(GrowthRow {
                month,
                service: baseline.service.clone(),
                projected_credits,
                projected_users,
                projected_cost,
                cost_per_user: safe_ratio(projected_cost, projected_users),
                growth_rate,
            });
        }
    }

    tracing::debug!(
        services = baselines.len(),
        months,
        growth_rate,
        "Growth projection computed"
    );

    Ok(GrowthProjection { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageRecord;
    use chrono::NaiveDate;

    fn baseline_sample() -> UsageSample {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        UsageSample::new(vec![
            UsageRecord::new(d(1), "Cortex Analyst", 400.0, 10.0, 100),
            UsageRecord::new(d(2), "Cortex Analyst", 600.0, 20.0, 100),
            UsageRecord::new(d(1), "Cortex Search", 50.0, 0.0, 10),
        ])
    }

    #[test]
    fn test_zero_growth_keeps_baseline() {
        let projection = project_growth(&baseline_sample(), 0.0, 6, 3.0).unwrap();
        for row in projection.rows.iter().filter(|r| r.service == "Cortex Analyst") {
            assert_eq!(row.projected_credits, 1000.0);
            assert_eq!(row.projected_users, 15.0);
        }
    }

    #[test]
    fn test_compound_growth_month_12() {
        let projection = project_growth(&baseline_sample(), 0.10, 12, 3.0).unwrap();
        let row = projection
            .month(12)
            .find(|r| r.service == "Cortex Analyst")
            .unwrap();
        let expected = 1000.0 * 1.1f64.powi(12) * 3.0;
        assert!((row.projected_cost - expected).abs() < 1e-6);
        assert!((row.projected_cost - 9415.3).abs() < 0.1);
    }

    #[test]
    fn test_rows_ordered_by_month() {
        let projection = project_growth(&baseline_sample(), 0.25, 3, 3.0).unwrap();
        let months: Vec<u32> = projection.rows.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![1, 1, 2, 2, 3, 3]);
        assert_eq!(projection.monthly_totals().len(), 3);
    }

    #[test]
    fn test_zero_users_zero_cost_per_user() {
        let projection = project_growth(&baseline_sample(), 0.25, 1, 3.0).unwrap();
        let search = projection.month(1).find(|r| r.service == "Cortex Search").unwrap();
        assert_eq!(search.cost_per_user, 0.0);
    }

    #[test]
    fn test_zero_months_is_empty() {
        let projection = project_growth(&baseline_sample(), 0.25, 0, 3.0).unwrap();
        assert!(projection.is_empty());
    }

    #[test]
    fn test_negative_growth_decays() {
        let projection = project_growth(&baseline_sample(), -0.5, 4, 1.0).unwrap();
        let credits: Vec<f64> = projection
            .rows
            .iter()
            .filter(|r| r.service == "Cortex Analyst")
            .map(|r| r.projected_credits)
            .collect();
        assert_eq!(credits, vec![500.0, 250.0, 125.0, 62.5]);
    }

    #[test]
    fn test_invalid_growth_rate() {
        let err = project_growth(&baseline_sample(), -1.0, 12, 3.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidGrowthRate { .. }));
        assert!(project_growth(&baseline_sample(), f64::NAN, 12, 3.0).is_err());
    }

    #[test]
    fn test_horizon_bounded() {
        let sample = baseline_sample();
        let projection = project_growth(&sample, 0.10, MAX_PROJECTION_MONTHS, 3.0).unwrap();
        let last = projection.monthly_totals().pop().unwrap();
        assert_eq!(last.month, MAX_PROJECTION_MONTHS);
        assert!(last.credits > 1050.0);

        let err = project_growth(&sample, 0.10, 3_000_000_000, 3.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidHorizon {
                months: 3_000_000_000,
                max: MAX_PROJECTION_MONTHS
            }
        ));
        assert!(project_growth(&sample, 0.10, MAX_PROJECTION_MONTHS + 1, 3.0).is_err());
    }

    #[test]
    fn test_scenario_presets() {
        assert_eq!(GrowthScenario::parse("MODERATE"), Some(GrowthScenario::Moderate));
        assert_eq!(GrowthScenario::Conservative.monthly_rate(), 0.10);
        assert_eq!(GrowthScenario::Aggressive.monthly_rate(), 0.50);
        assert!(GrowthScenario::parse("wild").is_none());
    }
}
