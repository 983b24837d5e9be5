//! Daily per-service usage observations
//!
//! A `UsageSample` is built once per report from a query result or an uploaded
//! extract and is never mutated afterwards. Every calculation that reasons
//! about "most recent" or rolling windows relies on the date-ascending order
//! established here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Services the ingestion layer recognises (unknown labels still pass through)
pub const KNOWN_SERVICES: &[&str] = &[
    "Cortex Analyst",
    "Cortex Search",
    "Cortex Functions",
    "Cortex Document Processing",
    "Cortex Fine-tuning",
];

/// One row of a daily-per-service observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Calendar day
    pub date: NaiveDate,
    /// Service label (open set)
    pub service: String,
    /// Metered credits consumed, never negative
    pub total_credits: f64,
    /// Distinct users that day (may be fractional once averaged)
    pub daily_unique_users: f64,
    /// Operations/requests that day
    pub total_operations: u64,
    /// Precomputed daily cost per user, passed through from the source view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_daily_cost_per_user: Option<f64>,
    /// Precomputed monthly cost per user, passed through from the source view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_monthly_cost_per_user: Option<f64>,
}

impl UsageRecord {
    pub fn new(
        date: NaiveDate,
        service: impl Into<String>,
        total_credits: f64,
        daily_unique_users: f64,
        total_operations: u64,
    ) -> Self {
        Self {
            date,
            service: service.into(),
            total_credits,
            daily_unique_users,
            total_operations,
            avg_daily_cost_per_user: None,
            projected_monthly_cost_per_user: None,
        }
    }
}

/// Per-service aggregate over the whole sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceTotals {
    pub service: String,
    /// Sum of credits
    pub total_credits: f64,
    /// Sum of operations
    pub total_operations: u64,
    /// Mean of daily unique users across the service's rows
    pub mean_daily_users: f64,
    /// Number of rows (days with data) for the service
    pub days_with_data: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Immutable, date-sorted collection of usage records, unique per (date, service)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSample {
    records: Vec<UsageRecord>,
}

impl UsageSample {
    /// Build a sample, sorting by (date, service)
    ///
    /// Duplicate (date, service) pairs keep the last occurrence.
    pub fn new(records: Vec<UsageRecord>) -> Self {
        let mut keyed: BTreeMap<(NaiveDate, String), UsageRecord> = BTreeMap::new();
        for record in records {
            let key = (record.date, record.service.clone());
            if keyed.insert(key, record).is_some() {
                tracing::warn!("Duplicate usage row for the same date and service, keeping last");
            }
        }

        Self {
            records: keyed.into_values().collect(),
        }
    }

    /// Empty sample
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in (date, service) ascending order
    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    /// Distinct calendar days present, ascending
    pub fn distinct_dates(&self) -> Vec<NaiveDate> {
        self.records
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of distinct calendar days present
    pub fn days_of_data(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Earliest and latest date, if any
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.records.first()?.date, self.records.last()?.date))
    }

    /// Distinct service labels, sorted
    pub fn services(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.service.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Total credits across every row
    pub fn total_credits(&self) -> f64 {
        self.records.iter().map(|r| r.total_credits).sum()
    }

    /// Mean of daily unique users across all rows (0 when empty)
    pub fn mean_daily_users(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: f64 = self.records.iter().map(|r| r.daily_unique_users).sum();
        total / self.records.len() as f64
    }

    /// Total credits per date across services, ascending by date
    pub fn daily_totals(&self) -> Vec<(NaiveDate, f64)> {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in &self.records {
            *totals.entry(record.date).or_default() += record.total_credits;
        }
        totals.into_iter().collect()
    }

    /// Records grouped by service, each group date-ascending
    pub fn by_service(&self) -> BTreeMap<&str, Vec<&UsageRecord>> {
        let mut groups: BTreeMap<&str, Vec<&UsageRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.service.as_str()).or_default().push(record);
        }
        groups
    }

    /// Whole-sample aggregates per service, sorted by service label
    pub fn service_totals(&self) -> Vec<ServiceTotals> {
        self.by_service()
            .into_iter()
            .filter_map(|(service, rows)| {
                let first = rows.first()?;
                let last = rows.last()?;
                let total_credits = rows.iter().map(|r| r.total_credits).sum();
                let total_operations = rows.iter().map(|r| r.total_operations).sum();
                let users: f64 = rows.iter().map(|r| r.daily_unique_users).sum();

                Some(ServiceTotals {
                    service: service.to_string(),
                    total_credits,
                    total_operations,
                    mean_daily_users: users / rows.len() as f64,
                    days_with_data: rows.len(),
                    first_date: first.date,
                    last_date: last.date,
                })
            })
            .collect()
    }

    /// Services not in `KNOWN_SERVICES`
    pub fn unknown_services(&self) -> Vec<&str> {
        self.services()
            .into_iter()
            .filter(|s| !KNOWN_SERVICES.contains(s))
            .collect()
    }
}
