//! Week-over-week cost alerts
//!
//! Each service's daily credits are compared with the same service exactly
//! seven calendar days earlier. Missing or zero prior days give an unknown
//! growth rather than an infinite one.

use crate::models::UsageSample;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Alert level derived from week-over-week growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertLevel {
    /// More than 50% growth
    High,
    /// More than 25% growth
    Medium,
    Normal,
    /// Negative growth
    Declining,
    /// No comparable prior day
    Unknown,
}

impl AlertLevel {
    /// Classify a growth percentage
    pub fn from_growth(growth_pct: Option<f64>) -> Self {
        match growth_pct {
            None => Self::Unknown,
            Some(g) if g > 50.0 => Self::High,
            Some(g) if g > 25.0 => Self::Medium,
            Some(g) if g < 0.0 => Self::Declining,
            Some(_) => Self::Normal,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "HIGH ALERT",
            Self::Medium => "MEDIUM ALERT",
            Self::Normal => "NORMAL",
            Self::Declining => "DECLINING",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Color name for terminal styling
    pub fn color_name(&self) -> &'static str {
        match self {
            Self::High => "red",
            Self::Medium => "yellow",
            Self::Normal => "green",
            Self::Declining => "blue",
            Self::Unknown => "grey",
        }
    }
}

/// One service-day compared with the prior week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekOverWeek {
    pub date: NaiveDate,
    pub service: String,
    pub credits: f64,
    pub prior_week_credits: Option<f64>,
    pub growth_pct: Option<f64>,
    pub level: AlertLevel,
}

/// Compare every service-day with the same service seven days earlier
///
/// Returned newest first, then by service.
pub fn week_over_week(sample: &UsageSample) -> Vec<WeekOverWeek> {
    let index: HashMap<(NaiveDate, &str), f64> = sample
        .records()
        .iter()
        .map(|r| ((r.date, r.service.as_str()), r.total_credits))
        .collect();

    let mut rows: Vec<WeekOverWeek> = sample
        .records()
        .iter()
        .map(|r| {
            let prior = index
                .get(&(r.date - Duration::days(7), r.service.as_str()))
                .copied();
            let growth_pct = prior
                .filter(|p| *p != 0.0)
                .map(|p| (r.total_credits - p) / p * 100.0);

            WeekOverWeek {
                date: r.date,
                service: r.service.clone(),
                credits: r.total_credits,
                prior_week_credits: prior,
                growth_pct,
                level: AlertLevel::from_growth(growth_pct),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.service.cmp(&b.service)));
    rows
}

/// Alerts at `Medium` or `High`, newest first
pub fn active_alerts(rows: &[WeekOverWeek]) -> Vec<&WeekOverWeek> {
    rows.iter()
        .filter(|r| matches!(r.level, AlertLevel::High | AlertLevel::Medium))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_alert_levels() {
        assert_eq!(AlertLevel::from_growth(Some(60.0)), AlertLevel::High);
        assert_eq!(AlertLevel::from_growth(Some(50.0)), AlertLevel::Medium);
        assert_eq!(AlertLevel::from_growth(Some(25.0)), AlertLevel::Normal);
        assert_eq!(AlertLevel::from_growth(Some(0.0)), AlertLevel::Normal);
        assert_eq!(AlertLevel::from_growth(Some(-1.0)), AlertLevel::Declining);
        assert_eq!(AlertLevel::from_growth(None), AlertLevel::Unknown);
    }

    #[test]
    fn test_week_over_week_same_service_only() {
        let sample = UsageSample::new(vec![
            UsageRecord::new(d(1), "Cortex Search", 10.0, 1.0, 1),
            UsageRecord::new(d(8), "Cortex Search", 16.0, 1.0, 1),
            UsageRecord::new(d(1), "Cortex Analyst", 0.0, 1.0, 1),
            UsageRecord::new(d(8), "Cortex Analyst", 5.0, 1.0, 1),
            UsageRecord::new(d(9), "Cortex Analyst", 5.0, 1.0, 1),
        ]);

        let rows = week_over_week(&sample);
        assert_eq!(rows[0].date, d(9));
        assert_eq!(rows[0].level, AlertLevel::Unknown);

        let search = rows
            .iter()
            .find(|r| r.date == d(8) && r.service == "Cortex Search")
            .unwrap();
        assert!((search.growth_pct.unwrap() - 60.0).abs() < 1e-9);
        assert_eq!(search.level, AlertLevel::High);

        // Zero prior credits: no growth figure
        let analyst = rows
            .iter()
            .find(|r| r.date == d(8) && r.service == "Cortex Analyst")
            .unwrap();
        assert_eq!(analyst.prior_week_credits, Some(0.0));
        assert_eq!(analyst.growth_pct, None);

        assert_eq!(active_alerts(&rows).len(), 1);
    }
}
