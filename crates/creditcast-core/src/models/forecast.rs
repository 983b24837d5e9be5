//! Externally produced ML forecast rows

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily forecast point for a service, with its prediction band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub service: String,
    pub forecast_date: NaiveDate,
    pub forecast_credits: f64,
    pub lower_bound_credits: f64,
    pub upper_bound_credits: f64,
}
