//! Stakeholder report assembly
//!
//! Turns a maturity assessment and one or more projections into a fixed-section
//! text proposal plus a small Metric/Value table for export. Section order is
//! fixed: header, current state, projected costs, assumptions, per-service
//! breakdown, disclaimer.

use crate::analytics::{
    BudgetRecommendation, MaturityAssessment, RunRateSummary, ScalingProjection, Snapshot,
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

const RULE_WIDTH: usize = 60;
const SECTION_WIDTH: usize = 40;

/// Point estimates and band of one projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub label: String,
    pub baseline_monthly_cost: f64,
    pub baseline_users: f64,
    pub projected_monthly_cost: f64,
    pub projected_annual_cost: f64,
    /// Bounds around the annual estimate
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub variance_pct: f64,
    /// Projected monthly cost per service, largest first
    pub service_breakdown: Vec<(String, f64)>,
}

impl ProjectionResult {
    /// Current run rate carried forward unchanged
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let run_rate: &RunRateSummary = &snapshot.run_rate;
        Self {
            label: "Current run rate".to_string(),
            baseline_monthly_cost: run_rate.monthly_cost,
            baseline_users: run_rate.avg_daily_users,
            projected_monthly_cost: run_rate.monthly_cost,
            projected_annual_cost: run_rate.annual_cost,
            lower_bound: snapshot.annual_interval.lower,
            upper_bound: snapshot.annual_interval.upper,
            variance_pct: snapshot.annual_interval.variance_pct,
            service_breakdown: run_rate
                .services
                .iter()
                .map(|s| (s.service.clone(), s.monthly_cost))
                .collect(),
        }
    }

    /// Production estimate from a scaling scenario
    ///
    /// Per-service costs scale by the same combined multiplier.
    pub fn from_scaling(
        run_rate: &RunRateSummary,
        projection: &ScalingProjection,
        budget: &BudgetRecommendation,
    ) -> Self {
        let factor = projection.user_multiplier * projection.usage_multiplier;
        Self {
            label: projection.scenario.display_name().to_string(),
            baseline_monthly_cost: projection.current_monthly_cost,
            baseline_users: projection.current_users,
            projected_monthly_cost: projection.projected_monthly_cost,
            projected_annual_cost: projection.projected_annual_cost,
            lower_bound: budget.annual.lower,
            upper_bound: budget.annual.upper,
            variance_pct: budget.annual.variance_pct,
            service_breakdown: run_rate
                .services
                .iter()
                .map(|s| (s.service.clone(), s.monthly_cost * factor))
                .collect(),
        }
    }
}

/// Assembled report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: NaiveDateTime,
    pub text: String,
    /// Metric/Value rows for machine export
    pub key_values: Vec<(String, String)>,
    pub quick_summary: String,
}

/// Assumption list describing a run-rate projection
pub fn default_assumptions(
    days_of_data: usize,
    avg_users: f64,
    credit_cost: f64,
    variance_pct: f64,
) -> Vec<String> {
    vec![
        format!("Based on {} days of observed usage data", days_of_data),
        format!("Average of {:.1} daily active users", avg_users),
        format!("Credit cost: ${:.2}/credit", credit_cost),
        format!(
            "Variance range: +/- {:.0}% (based on data maturity)",
            variance_pct * 100.0
        ),
        "Assumes current usage patterns continue".to_string(),
    ]
}

/// Assemble a report stamped with the current local time
pub fn assemble_report(
    maturity: &MaturityAssessment,
    projections: &[ProjectionResult],
    assumptions: &[String],
) -> Report {
    assemble_report_at(maturity, projections, assumptions, Local::now().naive_local())
}

/// Assemble a report with an explicit generation time
///
/// The first projection drives the current-state section, the service
/// breakdown, and the key/value table. With several projections each gets a
/// labelled block under PROJECTED COSTS.
pub fn assemble_report_at(
    maturity: &MaturityAssessment,
    projections: &[ProjectionResult],
    assumptions: &[String],
    generated_at: NaiveDateTime,
) -> Report {
    let rule = "=".repeat(RULE_WIDTH);
    let section = "-".repeat(SECTION_WIDTH);
    let primary = projections.first();
    let mut lines: Vec<String> = Vec::new();

    lines.push(rule.clone());
    lines.push("CORTEX COST ESTIMATE - EXECUTIVE SUMMARY".to_string());
    lines.push(rule.clone());
    lines.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")));
    lines.push(format!(
        "Data Confidence: {} ({}%)",
        maturity.label, maturity.confidence_score
    ));
    lines.push(String::new());

    lines.push("CURRENT STATE (Based on observed usage)".to_string());
    lines.push(section.clone());
    lines.push(format!("  Analysis Period: {} days", maturity.days_of_data));
    lines.push(format!(
        "  Monthly Run Rate: {}",
        format_currency(primary.map_or(0.0, |p| p.baseline_monthly_cost))
    ));
    lines.push(format!(
        "  Avg Daily Users: {:.0}",
        primary.map_or(0.0, |p| p.baseline_users)
    ));
    lines.push(String::new());

    lines.push("PROJECTED COSTS".to_string());
    lines.push(section.clone());
    if projections.is_empty() {
        lines.push("  No projection available".to_string());
    }
    for projection in projections {
        if projections.len() > 1 {
            lines.push(format!("  [{}]", projection.label));
        }
        lines.push(format!(
            "  Monthly Estimate: {}",
            format_currency(projection.projected_monthly_cost)
        ));
        lines.push(format!(
            "  Annual Estimate: {}",
            format_currency(projection.projected_annual_cost)
        ));
        lines.push(format!(
            "  Confidence Range: {} - {}",
            format_currency(projection.lower_bound),
            format_currency(projection.upper_bound)
        ));
    }
    lines.push(String::new());

    lines.push("ASSUMPTIONS".to_string());
    lines.push(section.clone());
    for assumption in assumptions {
        lines.push(format!("  - {}", assumption));
    }
    lines.push(String::new());

    lines.push("COST BREAKDOWN BY SERVICE".to_string());
    lines.push(section);
    if let Some(p) = primary {
        for (service, cost) in &p.service_breakdown {
            let pct = if p.projected_monthly_cost > 0.0 {
                cost / p.projected_monthly_cost * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {}: {} ({:.1}%)", service, format_currency(*cost), pct));
        }
    }
    lines.push(String::new());

    lines.push(rule.clone());
    lines.push("Note: Estimates based on POC/trial usage patterns.".to_string());
    lines.push(
        "Actual production costs may vary based on adoption and usage intensity.".to_string(),
    );
    lines.push(rule);

    Report {
        generated_at,
        text: lines.join("\n"),
        key_values: key_values(maturity, primary),
        quick_summary: quick_summary(maturity, primary),
    }
}

fn key_values(
    maturity: &MaturityAssessment,
    primary: Option<&ProjectionResult>,
) -> Vec<(String, String)> {
    let monthly = primary.map_or(0.0, |p| p.projected_monthly_cost);
    let users = primary.map_or(0.0, |p| p.baseline_users);
    let cost_per_user = if users > 0.0 { monthly / users } else { 0.0 };

    vec![
        ("Analysis Period (days)".to_string(), maturity.days_of_data.to_string()),
        ("Monthly Cost Estimate".to_string(), format_currency(monthly)),
        (
            "Annual Cost Estimate".to_string(),
            format_currency(primary.map_or(0.0, |p| p.projected_annual_cost)),
        ),
        (
            "Lower Bound (Annual)".to_string(),
            format_currency(primary.map_or(0.0, |p| p.lower_bound)),
        ),
        (
            "Upper Bound (Annual)".to_string(),
            format_currency(primary.map_or(0.0, |p| p.upper_bound)),
        ),
        ("Average Daily Users".to_string(), format!("{:.0}", users)),
        ("Cost per User/Month".to_string(), format_currency(cost_per_user)),
        (
            "Data Confidence".to_string(),
            format!("{} ({}%)", maturity.label, maturity.confidence_score),
        ),
    ]
}

/// One-paragraph summary for pasting into email or chat
pub fn quick_summary(maturity: &MaturityAssessment, primary: Option<&ProjectionResult>) -> String {
    match primary {
        Some(p) if maturity.days_of_data > 0 => format!(
            "Based on {} days of observed usage ({} confidence, {}%), estimated cost is {}/month \
             ({}/year), with an annual range of {} - {} (+/- {:.0}%).",
            maturity.days_of_data,
            maturity.label,
            maturity.confidence_score,
            format_currency(p.projected_monthly_cost),
            format_currency(p.projected_annual_cost),
            format_currency(p.lower_bound),
            format_currency(p.upper_bound),
            p.variance_pct * 100.0
        ),
        _ => format!("{} No estimate is available yet.", maturity.message),
    }
}

/// Currency with two decimals and thousands separators: `$1,234.56`, `-$1.00`
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Whole number with thousands separators: `12,346`
pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.abs().round() as u64;
    let sign = if value < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(rounded))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
