//! POC-to-production scaling and budget recommendation

use super::interval::{confidence_interval, ConfidenceInterval};
use super::safe_ratio;
use serde::Serialize;

/// Default safety buffer on top of the upper annual bound
pub const DEFAULT_BUDGET_BUFFER: f64 = 0.15;

/// Scaling preset, or caller-supplied multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ScalingScenario {
    /// 5-10 exploratory users
    LightPoc,
    /// 10-25 regular users
    StandardPoc,
    /// 25+ users, production-like
    HeavyPoc,
    Custom {
        user_multiplier: f64,
        usage_multiplier: f64,
    },
}

impl ScalingScenario {
    pub const PRESETS: [ScalingScenario; 3] = [Self::LightPoc, Self::StandardPoc, Self::HeavyPoc];

    /// Custom scenario; missing or non-positive multipliers default to 1
    pub fn custom(user_multiplier: Option<f64>, usage_multiplier: Option<f64>) -> Self {
        let positive_or_one = |m: Option<f64>| m.filter(|v| *v > 0.0).unwrap_or(1.0);
        Self::Custom {
            user_multiplier: positive_or_one(user_multiplier),
            usage_multiplier: positive_or_one(usage_multiplier),
        }
    }

    /// Parse a preset name (`light`, `standard`, `heavy`); `custom` uses 1x1
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" | "light-poc" => Some(Self::LightPoc),
            "standard" | "standard-poc" => Some(Self::StandardPoc),
            "heavy" | "heavy-poc" => Some(Self::HeavyPoc),
            "custom" => Some(Self::custom(None, None)),
            _ => None,
        }
    }

    /// (user multiplier, usage intensity multiplier)
    pub fn multipliers(&self) -> (f64, f64) {
        match *self {
            Self::LightPoc => (20.0, 1.5),
            Self::StandardPoc => (10.0, 1.2),
            Self::HeavyPoc => (4.0, 1.0),
            Self::Custom {
                user_multiplier,
                usage_multiplier,
            } => (user_multiplier, usage_multiplier),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LightPoc => "Light POC (5-10 users, exploratory)",
            Self::StandardPoc => "Standard POC (10-25 users, regular use)",
            Self::HeavyPoc => "Heavy POC (25+ users, production-like)",
            Self::Custom { .. } => "Custom",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::LightPoc => "Light POC",
            Self::StandardPoc => "Standard POC",
            Self::HeavyPoc => "Heavy POC",
            Self::Custom { .. } => "Custom",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::LightPoc => "POC users testing lightly -> Production with broader adoption",
            Self::StandardPoc => "Active POC testing -> Production steady-state",
            Self::HeavyPoc => "Production-like POC -> Full production rollout",
            Self::Custom { .. } => "Define your own scaling factors",
        }
    }
}

/// Current state scaled by a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingProjection {
    pub scenario: ScalingScenario,
    pub current_users: f64,
    pub current_monthly_cost: f64,
    pub user_multiplier: f64,
    pub usage_multiplier: f64,
    pub projected_users: f64,
    pub projected_monthly_cost: f64,
    pub projected_annual_cost: f64,
    /// 0 when projected users are 0
    pub cost_per_user: f64,
}

/// Apply a scenario's multipliers to the current monthly cost and users
///
/// Usage intensity compounds with the user multiplier for cost.
pub fn scale_to_production(
    current_monthly_cost: f64,
    current_users: f64,
    scenario: ScalingScenario,
) -> ScalingProjection {
    let (user_multiplier, usage_multiplier) = scenario.multipliers();
    let projected_users = current_users * user_multiplier;
    let projected_monthly_cost = current_monthly_cost * user_multiplier * usage_multiplier;

    ScalingProjection {
        scenario,
        current_users,
        current_monthly_cost,
        user_multiplier,
        usage_multiplier,
        projected_users,
        projected_monthly_cost,
        projected_annual_cost: projected_monthly_cost * 12.0,
        cost_per_user: safe_ratio(projected_monthly_cost, projected_users),
    }
}

/// Confidence bands and recommended budget for a scaling projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRecommendation {
    pub monthly: ConfidenceInterval,
    pub annual: ConfidenceInterval,
    pub buffer: f64,
    /// `annual.upper * (1 + buffer)`
    pub recommended_annual: f64,
    pub recommended_monthly: f64,
}

/// Recommend a budget: upper annual bound plus a safety buffer
pub fn recommend_budget(
    projection: &ScalingProjection,
    confidence_score: u8,
    custom_variance: Option<f64>,
    buffer: f64,
) -> BudgetRecommendation {
    let monthly = confidence_interval(
        projection.projected_monthly_cost,
        confidence_score,
        custom_variance,
    );
    let annual = confidence_interval(
        projection.projected_annual_cost,
        confidence_score,
        custom_variance,
    );
    let recommended_annual = annual.upper * (1.0 + buffer);

    BudgetRecommendation {
        monthly,
        annual,
        buffer,
        recommended_annual,
        recommended_monthly: recommended_annual / 12.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heavy_poc() {
        let p = scale_to_production(500.0, 10.0, ScalingScenario::HeavyPoc);
        assert_eq!(p.projected_users, 40.0);
        assert_eq!(p.projected_monthly_cost, 2000.0);
        assert_eq!(p.projected_annual_cost, 24000.0);
        assert_eq!(p.cost_per_user, 50.0);
    }

    #[test]
    fn test_preset_table() {
        assert_eq!(ScalingScenario::LightPoc.multipliers(), (20.0, 1.5));
        assert_eq!(ScalingScenario::StandardPoc.multipliers(), (10.0, 1.2));
        assert_eq!(ScalingScenario::HeavyPoc.multipliers(), (4.0, 1.0));
        assert_eq!(ScalingScenario::custom(None, None).multipliers(), (1.0, 1.0));
    }

    #[test]
    fn test_usage_compounds_with_users() {
        let p = scale_to_production(100.0, 5.0, ScalingScenario::LightPoc);
        assert_eq!(p.projected_users, 100.0);
        assert!((p.projected_monthly_cost - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_rejects_non_positive() {
        let s = ScalingScenario::custom(Some(0.0), Some(2.0));
        assert_eq!(s.multipliers(), (1.0, 2.0));
    }

    #[test]
    fn test_zero_users_zero_cost_per_user() {
        let p = scale_to_production(100.0, 0.0, ScalingScenario::StandardPoc);
        assert_eq!(p.cost_per_user, 0.0);
        assert!(p.projected_monthly_cost.is_finite());
    }

    #[test]
    fn test_budget_adds_buffer_to_upper_bound() {
        let p = scale_to_production(500.0, 10.0, ScalingScenario::HeavyPoc);
        let budget = recommend_budget(&p, 100, None, DEFAULT_BUDGET_BUFFER);

        // 24000 * 1.05 * 1.15
        assert!((budget.annual.upper - 25200.0).abs() < 1e-6);
        assert!((budget.recommended_annual - 28980.0).abs() < 1e-6);
        assert!((budget.recommended_monthly - 2415.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_scenarios() {
        assert_eq!(ScalingScenario::parse("Heavy"), Some(ScalingScenario::HeavyPoc));
        assert!(matches!(
            ScalingScenario::parse("custom"),
            Some(ScalingScenario::Custom { .. })
        ));
        assert!(ScalingScenario::parse("enterprise").is_none());
    }
}
