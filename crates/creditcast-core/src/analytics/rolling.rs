//! Trailing-window aggregation per service
//!
//! Windows are truncated at the start of a series: the value at position `i`
//! covers `[max(0, i - w + 1), i]`, so early entries use a shorter window
//! instead of being undefined.

use super::safe_ratio;
use crate::models::{UsageRecord, UsageSample};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::VecDeque;

/// Lazy trailing window over a stream of values
///
/// Yields `(sum, mean)` for each input position.
pub struct TrailingWindow<I> {
    values: I,
    buffer: VecDeque<f64>,
    size: usize,
}

impl<I: Iterator<Item = f64>> TrailingWindow<I> {
    /// A window of 0 behaves like a window of 1
    pub fn new(values: I, size: usize) -> Self {
        let size = size.max(1);
        Self {
            values,
            buffer: VecDeque::with_capacity(size),
            size,
        }
    }
}

impl<I: Iterator<Item = f64>> Iterator for TrailingWindow<I> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        if self.buffer.len() == self.size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);

        // Re-summing the buffer keeps results exact for integral inputs
        let sum: f64 = self.buffer.iter().sum();
        Some((sum, sum / self.buffer.len() as f64))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

/// Rolling sums, aligned to each input position
pub fn rolling_sum<I>(values: I, window: usize) -> impl Iterator<Item = f64>
where
    I: IntoIterator<Item = f64>,
{
    TrailingWindow::new(values.into_iter(), window).map(|(sum, _)| sum)
}

/// Rolling means, aligned to each input position
pub fn rolling_mean<I>(values: I, window: usize) -> impl Iterator<Item = f64>
where
    I: IntoIterator<Item = f64>,
{
    TrailingWindow::new(values.into_iter(), window).map(|(_, mean)| mean)
}

/// Window aggregates for one service on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub credits_sum: f64,
    pub operations_sum: f64,
    pub users_mean: f64,
    /// `credits_sum / users_mean`, 0 when no users
    pub credits_per_user: f64,
}

/// Lazily compute window aggregates over one service's date-ordered rows
pub fn rolling_series<'a>(
    rows: &'a [&'a UsageRecord],
    window: usize,
) -> impl Iterator<Item = RollingPoint> + 'a {
    let credits = rolling_sum(rows.iter().map(|r| r.total_credits), window);
    let operations = rolling_sum(rows.iter().map(|r| r.total_operations as f64), window);
    let users = rolling_mean(rows.iter().map(|r| r.daily_unique_users), window);

    rows.iter()
        .zip(credits)
        .zip(operations)
        .zip(users)
        .map(|(((row, credits_sum), operations_sum), users_mean)| RollingPoint {
            date: row.date,
            credits_sum,
            operations_sum,
            users_mean,
            credits_per_user: safe_ratio(credits_sum, users_mean),
        })
}

/// Full rolling series of one service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRolling {
    pub service: String,
    pub points: Vec<RollingPoint>,
}

impl ServiceRolling {
    /// Window ending on the service's most recent date
    pub fn latest(&self) -> Option<&RollingPoint> {
        self.points.last()
    }
}

/// Rolling aggregates for every service; no cross-service mixing
pub fn rolling_by_service(sample: &UsageSample, window: usize) -> Vec<ServiceRolling> {
    sample
        .by_service()
        .into_iter()
        .map(|(service, rows)| ServiceRolling {
            service: service.to_string(),
            points: rolling_series(&rows, window).collect(),
        })
        .collect()
}

/// Most recent window per service, converted to cost
#[derive(Debug, Clone, Serialize)]
pub struct LatestWindow {
    pub service: String,
    pub credits: f64,
    pub cost: f64,
    pub operations: f64,
    pub users_mean: f64,
    pub cost_per_user: f64,
}

/// Totals across the most recent window of each service
#[derive(Debug, Clone, Serialize)]
pub struct WindowTotals {
    pub window: usize,
    pub services: Vec<LatestWindow>,
    pub total_credits: f64,
    pub total_cost: f64,
    /// Mean of the per-service user means
    pub avg_users: f64,
    pub cost_per_user: f64,
}

/// Summarise the latest window of every service
pub fn latest_window_totals(sample: &UsageSample, window: usize, credit_cost: f64) -> WindowTotals {
    let services: Vec<LatestWindow> = rolling_by_service(sample, window)
        .into_iter()
        .filter_map(|series| {
            let point = series.latest()?.clone();
            Some(LatestWindow {
                credits: point.credits_sum,
                cost: point.credits_sum * credit_cost,
                operations: point.operations_sum,
                users_mean: point.users_mean,
                cost_per_user: point.credits_per_user * credit_cost,
                service: series.service,
            })
        })
        .collect();

    let total_credits: f64 = services.iter().map(|s| s.credits).sum();
    let total_cost = total_credits * credit_cost;
    let avg_users = if services.is_empty() {
        0.0
    } else {
        services.iter().map(|s| s.users_mean).sum::<f64>() / services.len() as f64
    };

    WindowTotals {
        window: window.max(1),
        services,
        total_credits,
        total_cost,
        avg_users,
        cost_per_user: safe_ratio(total_cost, avg_users),
    }
}
