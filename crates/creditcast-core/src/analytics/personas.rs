//! Per-request usage rates and persona cost estimates
//!
//! Personas are plain inputs: a name, a head count and a request rate. Nothing
//! is persisted between calls.

use super::safe_ratio;
use crate::models::UsageSample;
use serde::Serialize;
use std::str::FromStr;

/// Published Cortex Analyst rate: 67 credits per 1,000 messages
pub const PUBLISHED_CREDITS_PER_REQUEST: f64 = 0.067;

/// Days per month used for request volumes
const DAYS_PER_MONTH: f64 = 30.0;

/// Observed usage rates of one service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRate {
    pub service: String,
    pub total_operations: u64,
    pub mean_users: f64,
    pub total_credits: f64,
    pub days_with_data: usize,
    /// `operations / days_with_data`
    pub requests_per_day: f64,
    /// `credits * credit_cost / operations`, 0 when there are no operations
    pub cost_per_request: f64,
}

/// Compute per-service request rates over the whole sample
pub fn service_rates(sample: &UsageSample, credit_cost: f64) -> Vec<ServiceRate> {
    sample
        .service_totals()
        .into_iter()
        .map(|t| ServiceRate {
            requests_per_day: safe_ratio(t.total_operations as f64, t.days_with_data as f64),
            cost_per_request: safe_ratio(t.total_credits * credit_cost, t.total_operations as f64),
            service: t.service,
            total_operations: t.total_operations,
            mean_users: t.mean_daily_users,
            total_credits: t.total_credits,
            days_with_data: t.days_with_data,
        })
        .collect()
}

/// Volume-weighted cost per request across services, 0 with no operations
pub fn blended_cost_per_request(rates: &[ServiceRate]) -> f64 {
    let monthly_ops: f64 = rates.iter().map(|r| r.requests_per_day * DAYS_PER_MONTH).sum();
    let monthly_cost: f64 = rates
        .iter()
        .map(|r| r.requests_per_day * DAYS_PER_MONTH * r.cost_per_request)
        .sum();
    safe_ratio(monthly_cost, monthly_ops)
}

/// Cost per request at the published rate
pub fn published_cost_per_request(credit_cost: f64) -> f64 {
    PUBLISHED_CREDITS_PER_REQUEST * credit_cost
}

/// How the observed Cortex Analyst rate compares with the published one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateAgreement {
    /// Within 5%
    Match,
    /// Within 20%
    Acceptable,
    Deviation,
}

/// Observed vs published Cortex Analyst credits per request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateCheck {
    pub observed_credits_per_request: f64,
    pub published_credits_per_request: f64,
    pub difference_pct: f64,
    pub agreement: RateAgreement,
}

/// Compare the observed Cortex Analyst rate against the published one
///
/// `None` when the sample has no Cortex Analyst rows or the credit cost is 0.
pub fn analyst_rate_check(rates: &[ServiceRate], credit_cost: f64) -> Option<RateCheck> {
    let analyst = rates.iter().find(|r| r.service == "Cortex Analyst")?;
    if credit_cost <= 0.0 {
        return None;
    }

    let observed = analyst.cost_per_request / credit_cost;
    let difference_pct =
        ((observed - PUBLISHED_CREDITS_PER_REQUEST) / PUBLISHED_CREDITS_PER_REQUEST * 100.0).abs();
    let agreement = if difference_pct < 5.0 {
        RateAgreement::Match
    } else if difference_pct < 20.0 {
        RateAgreement::Acceptable
    } else {
        RateAgreement::Deviation
    };

    Some(RateCheck {
        observed_credits_per_request: observed,
        published_credits_per_request: PUBLISHED_CREDITS_PER_REQUEST,
        difference_pct,
        agreement,
    })
}

/// A group of users with a shared request rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Persona {
    pub name: String,
    pub user_count: u32,
    pub requests_per_day: f64,
}

impl Persona {
    pub fn new(name: impl Into<String>, user_count: u32, requests_per_day: f64) -> Self {
        Self {
            name: name.into(),
            user_count,
            requests_per_day,
        }
    }

    /// Power User (10 users, 50/day) and Regular User (30 users, 20/day)
    pub fn defaults() -> Vec<Persona> {
        vec![
            Persona::new("Power User", 10, 50.0),
            Persona::new("Regular User", 30, 20.0),
        ]
    }
}

impl FromStr for Persona {
    type Err = String;

    /// `NAME:USERS:REQUESTS_PER_DAY`, e.g. `Analyst:12:35`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let rpd = parts.next();
        let users = parts.next();
        let name = parts.next();

        match (name, users, rpd) {
            (Some(name), Some(users), Some(rpd)) if !name.trim().is_empty() => {
                let user_count = users
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("invalid user count '{}'", users))?;
                let requests_per_day = rpd
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| format!("invalid requests per day '{}'", rpd))?;
                Ok(Persona::new(name.trim(), user_count, requests_per_day))
            }
            _ => Err(format!(
                "expected NAME:USERS:REQUESTS_PER_DAY, got '{}'",
                s
            )),
        }
    }
}

/// Monthly cost of one persona
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaCost {
    pub name: String,
    pub users: u32,
    pub requests_per_day: f64,
    pub monthly_requests_per_user: f64,
    pub cost_per_request: f64,
    pub cost_per_user: f64,
    pub total_monthly_cost: f64,
}

/// Persona costs with totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaEstimate {
    pub cost_per_request: f64,
    pub personas: Vec<PersonaCost>,
    pub total_users: u64,
    pub total_monthly_requests: f64,
    pub total_monthly_cost: f64,
    /// 0 with no users
    pub avg_cost_per_user: f64,
}

/// Price each persona at `cost_per_request`
pub fn estimate_personas(personas: &[Persona], cost_per_request: f64) -> PersonaEstimate {
    let costs: Vec<PersonaCost> = personas
        .iter()
        .map(|p| {
            let monthly_requests = p.requests_per_day * DAYS_PER_MONTH;
            let cost_per_user = monthly_requests * cost_per_request;
            PersonaCost {
                name: p.name.clone(),
                users: p.user_count,
                requests_per_day: p.requests_per_day,
                monthly_requests_per_user: monthly_requests,
                cost_per_request,
                cost_per_user,
                total_monthly_cost: cost_per_user * f64::from(p.user_count),
            }
        })
        .collect();

    let total_users: u64 = personas.iter().map(|p| u64::from(p.user_count)).sum();
    let total_monthly_requests = costs
        .iter()
        .map(|c| c.monthly_requests_per_user * f64::from(c.users))
        .sum();
    let total_monthly_cost: f64 = costs.iter().map(|c| c.total_monthly_cost).sum();

    PersonaEstimate {
        cost_per_request,
        personas: costs,
        total_users,
        total_monthly_requests,
        total_monthly_cost,
        avg_cost_per_user: safe_ratio(total_monthly_cost, total_users as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageRecord;
    use chrono::NaiveDate;

    fn sample() -> UsageSample {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        UsageSample::new(vec![
            UsageRecord::new(d(1), "Cortex Analyst", 6.7, 4.0, 100),
            UsageRecord::new(d(2), "Cortex Analyst", 6.7, 6.0, 100),
            UsageRecord::new(d(1), "Cortex Search", 3.0, 2.0, 0),
        ])
    }

    #[test]
    fn test_service_rates() {
        let rates = service_rates(&sample(), 3.0);
        let analyst = &rates[0];
        assert_eq!(analyst.service, "Cortex Analyst");
        assert_eq!(analyst.requests_per_day, 100.0);
        assert!((analyst.cost_per_request - 0.201).abs() < 1e-9);
        assert_eq!(analyst.mean_users, 5.0);
    }

    #[test]
    fn test_zero_operations_cost_per_request_is_zero() {
        let rates = service_rates(&sample(), 3.0);
        let search = rates.iter().find(|r| r.service == "Cortex Search").unwrap();
        assert_eq!(search.cost_per_request, 0.0);
        assert_eq!(search.requests_per_day, 0.0);
    }

    #[test]
    fn test_blended_rate_weights_by_volume() {
        let rates = service_rates(&sample(), 3.0);
        // Search contributes no requests, so the blend equals Analyst's rate
        assert!((blended_cost_per_request(&rates) - 0.201).abs() < 1e-9);
        assert_eq!(blended_cost_per_request(&[]), 0.0);
    }

    #[test]
    fn test_analyst_rate_check_matches_published() {
        let rates = service_rates(&sample(), 3.0);
        let check = analyst_rate_check(&rates, 3.0).unwrap();
        assert!((check.observed_credits_per_request - 0.067).abs() < 1e-9);
        assert_eq!(check.agreement, RateAgreement::Match);
    }

    #[test]
    fn test_default_personas_at_published_rate() {
        let estimate = estimate_personas(&Persona::defaults(), published_cost_per_request(3.0));

        assert_eq!(estimate.total_users, 40);
        assert_eq!(estimate.total_monthly_requests, 33_000.0);
        // Power: 1500 req * 0.201 = 301.5 per user, 3015 total
        assert!((estimate.personas[0].cost_per_user - 301.5).abs() < 1e-9);
        assert!((estimate.personas[0].total_monthly_cost - 3015.0).abs() < 1e-9);
        assert!((estimate.total_monthly_cost - 6633.0).abs() < 1e-6);
        assert!((estimate.avg_cost_per_user - 165.825).abs() < 1e-6);
    }

    #[test]
    fn test_persona_from_str() {
        let p: Persona = "Data Analyst:12:35".parse().unwrap();
        assert_eq!(p.name, "Data Analyst");
        assert_eq!(p.user_count, 12);
        assert_eq!(p.requests_per_day, 35.0);

        assert!("Analyst:twelve:35".parse::<Persona>().is_err());
        assert!("Analyst:12".parse::<Persona>().is_err());
        assert!(":12:35".parse::<Persona>().is_err());
    }

    #[test]
    fn test_no_personas() {
        let estimate = estimate_personas(&[], 0.2);
        assert_eq!(estimate.total_users, 0);
        assert_eq!(estimate.avg_cost_per_user, 0.0);
    }
}
