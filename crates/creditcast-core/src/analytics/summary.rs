//! Run-rate summary of the observed sample
//!
//! Extrapolates the average day to a 30-day month and a 12-month year. This is
//! the "current state" every projection and report starts from.

use super::safe_ratio;
use crate::models::UsageSample;
use serde::Serialize;

/// Monthly run rate of one service with its share of the total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCost {
    pub service: String,
    pub total_credits: f64,
    pub monthly_cost: f64,
    pub annual_cost: f64,
    /// Percentage of total monthly cost (0-100)
    pub share_pct: f64,
}

/// Observed run rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRateSummary {
    pub credit_cost: f64,
    pub days_of_data: usize,
    pub total_credits: f64,
    pub total_cost: f64,
    pub avg_daily_credits: f64,
    pub monthly_credits: f64,
    pub monthly_cost: f64,
    pub annual_cost: f64,
    pub avg_daily_users: f64,
    /// 0 with no users
    pub cost_per_user_month: f64,
    /// Sorted by monthly cost, descending
    pub services: Vec<ServiceCost>,
}

impl RunRateSummary {
    /// Summarise a sample; an empty sample yields zeros everywhere
    pub fn from_sample(sample: &UsageSample, credit_cost: f64) -> Self {
        let days = sample.days_of_data();
        let total_credits = sample.total_credits();
        let avg_daily_credits = safe_ratio(total_credits, days as f64);
        let monthly_credits = avg_daily_credits * 30.0;
        let monthly_cost = monthly_credits * credit_cost;
        let avg_daily_users = sample.mean_daily_users();

        let mut services: Vec<ServiceCost> = sample
            .service_totals()
            .into_iter()
            .map(|t| {
                let service_monthly = safe_ratio(t.total_credits, days as f64) * 30.0 * credit_cost;
                ServiceCost {
                    service: t.service,
                    total_credits: t.total_credits,
                    monthly_cost: service_monthly,
                    annual_cost: service_monthly * 12.0,
                    share_pct: safe_ratio(service_monthly, monthly_cost) * 100.0,
                }
            })
            .collect();
        services.sort_by(|a, b| {
            b.monthly_cost
                .total_cmp(&a.monthly_cost)
                .then_with(|| a.service.cmp(&b.service))
        });

        Self {
            credit_cost,
            days_of_data: days,
            total_credits,
            total_cost: total_credits * credit_cost,
            avg_daily_credits,
            monthly_credits,
            monthly_cost,
            annual_cost: monthly_cost * 12.0,
            avg_daily_users,
            cost_per_user_month: safe_ratio(monthly_cost, avg_daily_users),
            services,
        }
    }

    /// The `n` largest cost drivers
    pub fn top_services(&self, n: usize) -> &[ServiceCost] {
        &self.services[..n.min(self.services.len())]
    }
}

/// Per-service credit estimate over each service's own date span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditEstimate {
    pub service: String,
    pub total_credits: f64,
    pub avg_daily_users: f64,
    /// `last - first + 1`
    pub days_spanned: i64,
    pub avg_credits_per_day: f64,
    pub est_credits_per_month: f64,
    pub est_cost_per_month: f64,
}

/// Credit estimate per service, sorted by service label
pub fn credit_summary(sample: &UsageSample, credit_cost: f64) -> Vec<CreditEstimate> {
    sample
        .service_totals()
        .into_iter()
        .map(|t| {
            let days_spanned = (t.last_date - t.first_date).num_days() + 1;
            let avg_credits_per_day = safe_ratio(t.total_credits, days_spanned as f64);
            let est_credits_per_month = avg_credits_per_day * 30.0;
            CreditEstimate {
                service: t.service,
                total_credits: t.total_credits,
                avg_daily_users: t.mean_daily_users,
                days_spanned,
                avg_credits_per_day,
                est_credits_per_month,
                est_cost_per_month: est_credits_per_month * credit_cost,
            }
        })
        .collect()
}
