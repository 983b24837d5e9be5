//! Output formatting for creditcast commands
//!
//! Every formatter renders either a comfy-table view or pretty JSON, so the
//! handlers in `main.rs` stay free of presentation details.

use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use creditcast_core::analytics::{
    BudgetRecommendation, ConfidenceInterval, ForecastPlan, FunctionAnalysis, GrowthProjection,
    MaturityAssessment,
    PersonaEstimate, RateCheck, ScalingProjection, ServiceRate, TrendDirection, WeekOverWeek,
    WindowTotals,
};
use creditcast_core::models::{UserSpend, TRACKED_FUNCTIONS};
use creditcast_core::report::{format_count, format_currency};
use creditcast_core::Snapshot;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum CliError {
    MissingDataPath,
    UsageNotFound { path: PathBuf },
    Denied { message: String },
    FetchFailed { message: String },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::MissingDataPath => write!(
                f,
                "No usage data: pass --data <csv> or set CREDITCAST_DATA"
            ),
            CliError::UsageNotFound { path } => {
                write!(f, "Usage data not found: {}", path.display())
            }
            CliError::Denied { message } => {
                write!(f, "Access to usage data denied: {}", message)
            }
            CliError::FetchFailed { message } => {
                write!(f, "Failed to load usage data: {}", message)
            }
        }
    }
}

impl std::error::Error for CliError {}

// ============================================================================
// Table helpers
// ============================================================================

fn new_table(titles: &[&str], no_color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if no_color {
        table.set_header(titles.to_vec());
    } else {
        table.set_header(
            titles
                .iter()
                .map(|t| Cell::new(t).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
    table
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn alert_color(level_color: &str) -> Color {
    match level_color {
        "red" => Color::Red,
        "yellow" => Color::Yellow,
        "green" => Color::Green,
        "blue" => Color::Blue,
        _ => Color::Grey,
    }
}

// ============================================================================
// Maturity
// ============================================================================

/// Maturity verdict with its recommendations
pub fn format_maturity(maturity: &MaturityAssessment, json: bool) -> String {
    if json {
        return to_json(maturity);
    }

    let mut lines = vec![
        format!(
            "Data Confidence:  {} ({}%)",
            maturity.label, maturity.confidence_score
        ),
        format!("Days of data:     {}", maturity.days_of_data),
        format!("Completeness:     {}", pct(maturity.completeness)),
        format!(
            "Ready to project: {}",
            if maturity.ready_for_projection { "yes" } else { "no" }
        ),
        String::new(),
        maturity.message.clone(),
    ];
    if !maturity.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("Recommendations:".to_string());
        lines.extend(maturity.recommendations.iter().map(|r| format!("  - {}", r)));
    }
    lines.join("\n")
}

/// Declined projection: maturity message instead of numbers
pub fn format_not_ready(maturity: &MaturityAssessment, json: bool) -> String {
    if json {
        return to_json(&json!({
            "ready_for_projection": false,
            "maturity": maturity,
        }));
    }

    format!(
        "Not enough data to project costs yet.\n\n{}",
        format_maturity(maturity, false)
    )
}

// ============================================================================
// Summary
// ============================================================================

/// Run rate, confidence band, and top cost drivers
pub fn format_summary(snapshot: &Snapshot, json: bool, no_color: bool) -> String {
    if json {
        return to_json(snapshot);
    }

    let run_rate = &snapshot.run_rate;
    let band = &snapshot.annual_interval;
    let mut lines = vec![
        format!(
            "Data Confidence:   {} ({}%), {} days",
            snapshot.maturity.label, snapshot.maturity.confidence_score, run_rate.days_of_data
        ),
        format!(
            "Total Credits:     {} ({})",
            format_count(run_rate.total_credits),
            format_currency(run_rate.total_cost)
        ),
        format!(
            "Avg Daily Credits: {:.2}",
            run_rate.avg_daily_credits
        ),
        format!("Monthly Cost:      {}", format_currency(run_rate.monthly_cost)),
        format!("Annual Cost:       {}", format_currency(run_rate.annual_cost)),
        format!(
            "Annual Range:      {} - {} (+/- {:.0}%)",
            format_currency(band.lower),
            format_currency(band.upper),
            band.variance_pct * 100.0
        ),
        format!("Avg Daily Users:   {:.1}", run_rate.avg_daily_users),
        format!(
            "Cost/User/Month:   {}",
            format_currency(run_rate.cost_per_user_month)
        ),
    ];

    if !run_rate.services.is_empty() {
        let mut table = new_table(&["Service", "Credits", "Monthly", "Annual", "Share"], no_color);
        for service in &run_rate.services {
            table.add_row(Row::from(vec![
                service.service.clone(),
                format!("{:.2}", service.total_credits),
                format_currency(service.monthly_cost),
                format_currency(service.annual_cost),
                format!("{:.1}%", service.share_pct),
            ]));
        }
        lines.push(String::new());
        lines.push(table.to_string());
    }

    lines.join("\n")
}

// ============================================================================
// History
// ============================================================================

/// Latest trailing window per service plus active week-over-week alerts
pub fn format_history(
    totals: &WindowTotals,
    alerts: &[&WeekOverWeek],
    json: bool,
    no_color: bool,
) -> String {
    if json {
        return to_json(&json!({
            "window": totals,
            "alerts": alerts,
        }));
    }

    if totals.services.is_empty() {
        return "No usage history.".to_string();
    }

    let mut table = new_table(
        &["Service", "Credits", "Cost", "Operations", "Avg Users", "Cost/User"],
        no_color,
    );
    for service in &totals.services {
        table.add_row(Row::from(vec![
            service.service.clone(),
            format!("{:.2}", service.credits),
            format_currency(service.cost),
            format_count(service.operations),
            format!("{:.1}", service.users_mean),
            format_currency(service.cost_per_user),
        ]));
    }

    let mut out = format!(
        "Last {} days: {} ({:.2} credits, {:.1} avg users, {}/user)\n{}",
        totals.window,
        format_currency(totals.total_cost),
        totals.total_credits,
        totals.avg_users,
        format_currency(totals.cost_per_user),
        table
    );

    if alerts.is_empty() {
        out.push_str("\n\nNo week-over-week alerts.");
        return out;
    }

    let mut alert_table = new_table(&["Date", "Service", "Credits", "Prior Week", "Growth", "Level"], no_color);
    for alert in alerts {
        let level = if no_color {
            Cell::new(alert.level.label())
        } else {
            Cell::new(alert.level.label()).fg(alert_color(alert.level.color_name()))
        };
        alert_table.add_row(Row::from(vec![
            Cell::new(alert.date.format("%Y-%m-%d")),
            Cell::new(&alert.service),
            Cell::new(format!("{:.2}", alert.credits)),
            Cell::new(
                alert
                    .prior_week_credits
                    .map(|c| format!("{:.2}", c))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                alert
                    .growth_pct
                    .map(|g| format!("{:+.1}%", g))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            level,
        ]));
    }
    out.push_str("\n\nWeek-over-week alerts:\n");
    out.push_str(&alert_table.to_string());
    out
}

// ============================================================================
// Projections
// ============================================================================

/// Monthly growth totals, with a band around the final month
pub fn format_growth(
    projection: &GrowthProjection,
    growth_rate: f64,
    final_band: &ConfidenceInterval,
    json: bool,
    no_color: bool,
) -> String {
    if json {
        return to_json(&json!({
            "growth_rate": growth_rate,
            "rows": projection.rows,
            "monthly_totals": projection.monthly_totals(),
            "final_month_interval": final_band,
        }));
    }

    if projection.is_empty() {
        return "No usage to project.".to_string();
    }

    let mut table = new_table(&["Month", "Credits", "Users", "Cost"], no_color);
    for total in projection.monthly_totals() {
        table.add_row(Row::from(vec![
            total.month.to_string(),
            format!("{:.2}", total.credits),
            format!("{:.1}", total.users),
            format_currency(total.cost),
        ]));
    }

    format!(
        "Growth: {} per month\n{}\n\nFinal month range: {} - {} (+/- {:.0}%)\nTotal over period: {}",
        pct(growth_rate),
        table,
        format_currency(final_band.lower),
        format_currency(final_band.upper),
        final_band.variance_pct * 100.0,
        format_currency(projection.total_cost())
    )
}

/// Monthly forecast, labelled with its source
pub fn format_forecast(plan: &ForecastPlan, json: bool, no_color: bool) -> String {
    if json {
        return to_json(plan);
    }

    let heading = match plan {
        ForecastPlan::Ml(_) => "Source: ML forecast".to_string(),
        ForecastPlan::LinearFallback(linear) => {
            let direction = match linear.fit.direction {
                TrendDirection::Up(p) => format!("up {:.1}%/30d", p),
                TrendDirection::Down(p) => format!("down {:.1}%/30d", p),
                TrendDirection::Stable => "stable".to_string(),
            };
            format!(
                "Source: linear trend ({} points, R² {:.2}, {})",
                linear.fit.points, linear.fit.r_squared, direction
            )
        }
    };

    let mut table = new_table(&["Month", "Credits", "Cost", "Range"], no_color);
    for month in plan.months() {
        let range = match (month.lower_cost, month.upper_cost) {
            (Some(lower), Some(upper)) => {
                format!("{} - {}", format_currency(lower), format_currency(upper))
            }
            _ => "-".to_string(),
        };
        table.add_row(Row::from(vec![
            month.month.format("%Y-%m").to_string(),
            format!("{:.2}", month.credits),
            format_currency(month.cost),
            range,
        ]));
    }

    format!(
        "{}\n{}\nTotal: {:.2} credits ({})",
        heading,
        table,
        plan.total_credits(),
        format_currency(plan.total_cost())
    )
}

/// POC-to-production scaling with the recommended budget
pub fn format_scaling(
    projection: &ScalingProjection,
    budget: &BudgetRecommendation,
    json: bool,
) -> String {
    if json {
        return to_json(&json!({
            "projection": projection,
            "budget": budget,
        }));
    }

    [
        format!("Scenario:          {}", projection.scenario.display_name()),
        format!("                   {}", projection.scenario.description()),
        format!(
            "Multipliers:       {:.1}x users, {:.1}x usage",
            projection.user_multiplier, projection.usage_multiplier
        ),
        format!(
            "Current:           {} / month, {:.1} users",
            format_currency(projection.current_monthly_cost),
            projection.current_users
        ),
        format!(
            "Production:        {} / month, {:.0} users",
            format_currency(projection.projected_monthly_cost),
            projection.projected_users
        ),
        format!(
            "Annual:            {}",
            format_currency(projection.projected_annual_cost)
        ),
        format!(
            "Cost/User/Month:   {}",
            format_currency(projection.cost_per_user)
        ),
        String::new(),
        format!(
            "Monthly Range:     {} - {}",
            format_currency(budget.monthly.lower),
            format_currency(budget.monthly.upper)
        ),
        format!(
            "Annual Range:      {} - {} (+/- {:.0}%)",
            format_currency(budget.annual.lower),
            format_currency(budget.annual.upper),
            budget.annual.variance_pct * 100.0
        ),
        format!(
            "Recommended:       {} / year ({} / month, {:.0}% buffer)",
            format_currency(budget.recommended_annual),
            format_currency(budget.recommended_monthly),
            budget.buffer * 100.0
        ),
    ]
    .join("\n")
}

// ============================================================================
// Personas & attribution
// ============================================================================

/// Per-service rates, persona costs, and the Cortex Analyst rate check
pub fn format_personas(
    rates: &[ServiceRate],
    estimate: &PersonaEstimate,
    rate_check: Option<&RateCheck>,
    json: bool,
    no_color: bool,
) -> String {
    if json {
        return to_json(&json!({
            "service_rates": rates,
            "estimate": estimate,
            "rate_check": rate_check,
        }));
    }

    let mut out = String::new();

    if !rates.is_empty() {
        let mut table = new_table(&["Service", "Operations", "Req/Day", "Cost/Request"], no_color);
        for rate in rates {
            table.add_row(Row::from(vec![
                rate.service.clone(),
                format_count(rate.total_operations as f64),
                format!("{:.1}", rate.requests_per_day),
                format!("${:.4}", rate.cost_per_request),
            ]));
        }
        out.push_str(&table.to_string());
        out.push_str("\n\n");
    }

    let mut table = new_table(
        &["Persona", "Users", "Req/Day", "Req/Month", "Cost/User", "Total"],
        no_color,
    );
    for persona in &estimate.personas {
        table.add_row(Row::from(vec![
            persona.name.clone(),
            persona.users.to_string(),
            format!("{:.0}", persona.requests_per_day),
            format_count(persona.monthly_requests_per_user),
            format_currency(persona.cost_per_user),
            format_currency(persona.total_monthly_cost),
        ]));
    }
    out.push_str(&format!(
        "Cost per request: ${:.4}\n{}\nTotal: {} users, {} requests, {} / month ({} / user)",
        estimate.cost_per_request,
        table,
        estimate.total_users,
        format_count(estimate.total_monthly_requests),
        format_currency(estimate.total_monthly_cost),
        format_currency(estimate.avg_cost_per_user)
    ));

    if let Some(check) = rate_check {
        out.push_str(&format!(
            "\n\nCortex Analyst: {:.4} credits/request observed vs {:.3} published ({:.1}% off, {:?})",
            check.observed_credits_per_request,
            check.published_credits_per_request,
            check.difference_pct,
            check.agreement
        ));
    }

    out
}

/// Top users by credits
pub fn format_attribution(users: &[UserSpend], json: bool, no_color: bool) -> String {
    if json {
        return to_json(users);
    }

    if users.is_empty() {
        return "No attributed usage found.".to_string();
    }

    let mut table = new_table(&["User", "Credits", "Cost", "Operations", "Services"], no_color);
    for user in users {
        table.add_row(Row::from(vec![
            user.user_name.clone(),
            format!("{:.2}", user.credits),
            format_currency(user.cost),
            format_count(user.operations as f64),
            user.services.to_string(),
        ]));
    }
    table.to_string()
}

// ============================================================================
// Functions
// ============================================================================

/// Overview, top functions, model comparison, and the daily trend
pub fn format_functions(analysis: &FunctionAnalysis, json: bool, no_color: bool) -> String {
    if json {
        return to_json(analysis);
    }

    if analysis.is_empty() {
        let mut lines = vec![
            "No AI function usage found.".to_string(),
            String::new(),
            "Tracked functions:".to_string(),
        ];
        lines.extend(TRACKED_FUNCTIONS.iter().map(|f| format!("  - {}", f)));
        return lines.join("\n");
    }

    let overview = &analysis.overview;
    let mut sections = vec![[
        format!("Functions used: {}", overview.functions_used),
        format!("Models used:    {}", overview.models_used),
        format!("Total calls:    {}", format_count(overview.total_calls as f64)),
        format!("Total cost:     {}", format_currency(overview.total_cost)),
    ]
    .join("\n")];

    let mut functions = new_table(
        &["Function", "Calls", "Credits", "Cost", "Tokens", "Serverless", "Compute"],
        no_color,
    );
    for f in &analysis.top_functions {
        functions.add_row(Row::from(vec![
            f.function_name.clone(),
            format_count(f.calls as f64),
            format!("{:.4}", f.credits),
            format_currency(f.cost),
            format_count(f.tokens as f64),
            format_count(f.serverless_calls as f64),
            format_count(f.compute_calls as f64),
        ]));
    }
    sections.push(format!("Top functions by cost\n{}", functions));

    if !analysis.models.is_empty() {
        let mut models = new_table(
            &["Model", "Functions", "Calls", "Credits", "Cost", "Cost / 1M tokens", "Median", "P90"],
            no_color,
        );
        for m in &analysis.models {
            models.add_row(Row::from(vec![
                m.model_name.clone(),
                m.functions_used.to_string(),
                format_count(m.total_calls as f64),
                format!("{:.4}", m.total_credits),
                format_currency(m.cost),
                format_currency(m.cost_per_million_tokens),
                format!("{:.4}", m.median_credits),
                format!("{:.4}", m.p90_credits),
            ]));
        }
        sections.push(format!("Model comparison\n{}", models));
    }

    if !analysis.daily_trend.is_empty() {
        let mut trend = new_table(&["Date", "Function", "Credits", "Tokens"], no_color);
        for point in &analysis.daily_trend {
            trend.add_row(Row::from(vec![
                point.date.to_string(),
                point.function_name.clone(),
                format!("{:.4}", point.credits),
                format_count(point.tokens as f64),
            ]));
        }
        sections.push(format!("Daily credits by function\n{}", trend));
    }

    sections.join("\n\n")
}

// ============================================================================
// Tests
// ============================================================================
