//! Data models for creditcast

pub mod attribution;
pub mod config;
pub mod forecast;
pub mod functions;
pub mod usage;

pub use attribution::{top_users, AttributionRecord, UserSpend};
pub use config::EstimatorConfig;
pub use forecast::ForecastRow;
pub use functions::{FunctionUsageRecord, TRACKED_FUNCTIONS};
pub use usage::{ServiceTotals, UsageRecord, UsageSample, KNOWN_SERVICES};
