//! Per-user cost attribution rows
//!
//! Consumed by the presentation layer only; the projection engine never reads
//! these.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credits used by one user on one feature/model on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRecord {
    pub date: NaiveDate,
    pub user_name: String,
    pub service: String,
    pub feature_name: String,
    pub model_name: String,
    pub credits_used: f64,
    pub operations: u64,
}

/// Aggregate spend of a single user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSpend {
    pub user_name: String,
    pub credits: f64,
    pub cost: f64,
    pub operations: u64,
    /// Distinct services the user touched
    pub services: usize,
}

/// Rank users by credits, descending, keeping the first `top`
pub fn top_users(records: &[AttributionRecord], credit_cost: f64, top: usize) -> Vec<UserSpend> {
    let mut by_user: HashMap<&str, (f64, u64, Vec<&str>)> = HashMap::new();
    for record in records {
        let entry = by_user.entry(record.user_name.as_str()).or_default();
        entry.0 += record.credits_used;
        entry.1 += record.operations;
        if !entry.2.contains(&record.service.as_str()) {
            entry.2.push(record.service.as_str());
        }
    }

    let mut users: Vec<UserSpend> = by_user
        .into_iter()
        .map(|(user, (credits, operations, services))| UserSpend {
            user_name: user.to_string(),
            credits,
            cost: credits * credit_cost,
            operations,
            services: services.len(),
        })
        .collect();

    users.sort_by(|a, b| {
        b.credits
            .total_cmp(&a.credits)
            .then_with(|| a.user_name.cmp(&b.user_name))
    });
    users.truncate(top);
    users
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, service: &str, credits: f64) -> AttributionRecord {
        AttributionRecord {
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            user_name: user.to_string(),
            service: service.to_string(),
            feature_name: "chat".to_string(),
            model_name: "model-a".to_string(),
            credits_used: credits,
            operations: 2,
        }
    }

    #[test]
    fn test_top_users_ranks_by_credits() {
        let records = vec![
            record("ALICE", "Cortex Analyst", 1.0),
            record("BOB", "Cortex Analyst", 4.0),
            record("ALICE", "Cortex Search", 2.0),
            record("CAROL", "Cortex Search", 0.5),
        ];

        let top = top_users(&records, 3.0, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_name, "BOB");
        assert_eq!(top[1].user_name, "ALICE");
        assert_eq!(top[1].credits, 3.0);
        assert_eq!(top[1].cost, 9.0);
        assert_eq!(top[1].services, 2);
        assert_eq!(top[1].operations, 4);
    }
}
