//! creditcast - Cost estimator for AI service credit usage

mod cli;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use creditcast_core::analytics::{
    active_alerts, analyst_rate_check, analyze_functions, blended_cost_per_request,
    confidence_interval, estimate_personas, latest_window_totals, plan_forecast, project_growth,
    published_cost_per_request, recommend_budget, scale_to_production, service_rates,
    week_over_week, GrowthScenario, Persona, ScalingScenario, MAX_PROJECTION_MONTHS,
};
use creditcast_core::models::top_users;
use creditcast_core::parsers::{AttributionCsvParser, FunctionCsvParser};
use creditcast_core::report::{assemble_report, default_assumptions};
use creditcast_core::{
    export_bundle, export_function_breakdown_csv, function_breakdown_path, CsvForecastSource,
    CsvUsageSource, EstimatorConfig, FetchCache, FetchOutcome, LoadReport, ProjectionResult,
    Snapshot, TwoStageFetch, UsageSample, UsageSource,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "creditcast",
    version,
    about = "Estimate and project AI service credit costs from daily usage",
    long_about = "Reads a daily per-service usage extract, judges whether there is enough\n\
                  history to trust a projection, and turns it into confidence-banded cost\n\
                  estimates and a budget proposal.\n\
                  \n\
                  Examples:\n\
                    creditcast --data usage.csv                      # Run-rate summary (default)\n\
                    creditcast --data usage.csv maturity             # Data confidence only\n\
                    creditcast --data usage.csv project --scenario aggressive\n\
                    creditcast --data usage.csv scale --scenario standard\n\
                    creditcast --data usage.csv proposal --output ./out\n\
                    creditcast functions --file aisql_functions.csv\n\
                  \n\
                  Environment Variables:\n\
                    CREDITCAST_DATA              # Usage extract (CSV)\n\
                    CREDITCAST_CREDIT_COST       # USD per credit\n\
                    CREDITCAST_NO_COLOR          # Disable ANSI colors (log-friendly)\n\
                    RUST_LOG                     # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Usage extract CSV
    #[arg(long, env = "CREDITCAST_DATA", global = true)]
    data: Option<PathBuf>,

    /// Secondary usage extract, read when the primary is missing or empty
    #[arg(long, env = "CREDITCAST_FALLBACK_DATA", global = true)]
    fallback_data: Option<PathBuf>,

    /// Config file (default: <config_dir>/creditcast/config.toml)
    #[arg(long, env = "CREDITCAST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// USD per credit
    #[arg(long, env = "CREDITCAST_CREDIT_COST", global = true)]
    credit_cost: Option<f64>,

    /// Days of history to use
    #[arg(long, env = "CREDITCAST_LOOKBACK", global = true)]
    lookback: Option<u32>,

    /// Reference date for the lookback window (YYYY-MM-DD, default: today)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    /// Fixed variance band as a fraction (0.2 = +/- 20%)
    #[arg(long, env = "CREDITCAST_VARIANCE", global = true)]
    variance: Option<f64>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "CREDITCAST_NO_COLOR", global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run-rate summary with confidence band (default)
    Summary,
    /// Data maturity assessment
    Maturity,
    /// Trailing window totals and week-over-week alerts
    History {
        /// Trailing window in days
        #[arg(long, default_value = "7")]
        window: usize,
    },
    /// Compound monthly growth projection
    Project {
        /// Monthly growth rate (0.25 = 25%)
        #[arg(long, conflicts_with = "scenario")]
        growth: Option<f64>,
        /// Growth preset
        #[arg(long, value_parser = ["conservative", "moderate", "aggressive"])]
        scenario: Option<String>,
        /// Months to project
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_PROJECTION_MONTHS)))]
        months: Option<u32>,
    },
    /// Monthly forecast from ML rows, or a linear trend fallback
    Forecast {
        /// ML forecast CSV
        #[arg(long)]
        ml_forecast: Option<PathBuf>,
        /// Months to forecast
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PROJECTION_MONTHS)))]
        months: Option<u32>,
    },
    /// Scale POC usage to production
    Scale {
        /// Scaling preset
        #[arg(long, value_parser = ["light", "standard", "heavy", "custom"])]
        scenario: String,
        /// User multiplier (custom only)
        #[arg(long)]
        user_mult: Option<f64>,
        /// Usage intensity multiplier (custom only)
        #[arg(long)]
        usage_mult: Option<f64>,
    },
    /// Price user personas per request
    Personas {
        /// NAME:USERS:REQUESTS_PER_DAY (repeatable)
        #[arg(long = "persona")]
        personas: Vec<Persona>,
        /// Use the published per-request rate instead of the observed one
        #[arg(long)]
        published_rate: bool,
    },
    /// Assemble the budget proposal
    Proposal {
        /// Write proposal, summary, usage, and JSON report into this directory
        #[arg(long)]
        output: Option<PathBuf>,
        /// Add a production scaling projection
        #[arg(long, value_parser = ["light", "standard", "heavy"])]
        scenario: Option<String>,
    },
    /// Top users from a per-user attribution extract
    Attribution {
        /// Attribution CSV
        #[arg(long)]
        file: PathBuf,
        /// Number of users to show
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Spend per AI function and model from a function usage extract
    Functions {
        /// Function/model usage CSV
        #[arg(long)]
        file: PathBuf,
        /// Number of functions to show
        #[arg(long, default_value = "10")]
        top: usize,
        /// Trailing days in the daily trend
        #[arg(long, default_value = "30")]
        days: u32,
        /// Also write the function x model breakdown CSV into this directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Resolved options shared by every handler
struct Settings {
    config: EstimatorConfig,
    data: Option<PathBuf>,
    fallback_data: Option<PathBuf>,
    as_of: Option<NaiveDate>,
    json: bool,
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    match cli.command.unwrap_or(Command::Summary) {
        Command::Summary => {
            let sample = load_sample(&settings).await?;
            run_summary(&settings, &sample);
        }
        Command::Maturity => {
            let sample = load_sample(&settings).await?;
            run_maturity(&settings, &sample);
        }
        Command::History { window } => {
            let sample = load_sample(&settings).await?;
            run_history(&settings, &sample, window);
        }
        Command::Project {
            growth,
            scenario,
            months,
        } => {
            let sample = load_sample(&settings).await?;
            run_project(&settings, &sample, growth, scenario.as_deref(), months)?;
        }
        Command::Forecast {
            ml_forecast,
            months,
        } => {
            let sample = load_sample(&settings).await?;
            run_forecast(&settings, &sample, ml_forecast, months).await?;
        }
        Command::Scale {
            scenario,
            user_mult,
            usage_mult,
        } => {
            let sample = load_sample(&settings).await?;
            run_scale(&settings, &sample, &scenario, user_mult, usage_mult)?;
        }
        Command::Personas {
            personas,
            published_rate,
        } => {
            let sample = load_sample(&settings).await?;
            run_personas(&settings, &sample, personas, published_rate);
        }
        Command::Proposal { output, scenario } => {
            let sample = load_sample(&settings).await?;
            run_proposal(&settings, &sample, output, scenario.as_deref())?;
        }
        Command::Attribution { file, top } => {
            run_attribution(&settings, file, top)?;
        }
        Command::Functions {
            file,
            top,
            days,
            output,
        } => {
            run_functions(&settings, file, top, days, output)?;
        }
    }

    Ok(())
}

/// Config file first, then flags and environment on top
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut config = match &cli.config {
        Some(path) => EstimatorConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EstimatorConfig::load_or_default().context("Failed to load default config")?,
    };

    if let Some(credit_cost) = cli.credit_cost {
        config.credit_cost = credit_cost;
    }
    if let Some(lookback) = cli.lookback {
        config.lookback_days = lookback;
    }
    if cli.variance.is_some() {
        config.variance_override = cli.variance;
    }
    config.validate().context("Invalid settings")?;

    Ok(Settings {
        config,
        data: cli.data.clone(),
        fallback_data: cli.fallback_data.clone(),
        as_of: cli.as_of,
        json: cli.json,
        no_color: cli.no_color,
    })
}

async fn load_sample(settings: &Settings) -> Result<UsageSample> {
    let data = settings.data.as_ref().ok_or(cli::CliError::MissingDataPath)?;
    let lookback = settings.config.lookback_days;
    let primary = CsvUsageSource::new(data).with_as_of(settings.as_of);

    let outcome = match &settings.fallback_data {
        Some(fallback) => {
            let secondary = CsvUsageSource::new(fallback).with_as_of(settings.as_of);
            fetch_cached(TwoStageFetch::new(primary, secondary), &settings.config).await
        }
        None => fetch_cached(primary, &settings.config).await,
    };

    match outcome {
        FetchOutcome::Loaded(sample) => Ok(sample),
        FetchOutcome::Empty => {
            tracing::warn!(lookback, "No usage rows in the lookback window");
            Ok(UsageSample::empty())
        }
        FetchOutcome::NotFound => Err(cli::CliError::UsageNotFound { path: data.clone() }.into()),
        FetchOutcome::Denied(message) => Err(cli::CliError::Denied { message }.into()),
        FetchOutcome::Failed(message) => Err(cli::CliError::FetchFailed { message }.into()),
    }
}

/// Fetch through the TTL cache sized by the config
async fn fetch_cached<S: UsageSource>(source: S, config: &EstimatorConfig) -> FetchOutcome<UsageSample> {
    FetchCache::from_config(source, config)
        .fetch(config.lookback_days)
        .await
}

fn snapshot(settings: &Settings, sample: &UsageSample) -> Snapshot {
    Snapshot::compute(
        sample,
        settings.config.credit_cost,
        settings.config.variance_override,
    )
}

// ============================================================================
// Command Handlers
// ============================================================================

fn run_summary(settings: &Settings, sample: &UsageSample) {
    let snapshot = snapshot(settings, sample);
    println!(
        "{}",
        cli::format_summary(&snapshot, settings.json, settings.no_color)
    );
}

fn run_maturity(settings: &Settings, sample: &UsageSample) {
    let snapshot = snapshot(settings, sample);
    println!("{}", cli::format_maturity(&snapshot.maturity, settings.json));
}

fn run_history(settings: &Settings, sample: &UsageSample, window: usize) {
    let totals = latest_window_totals(sample, window, settings.config.credit_cost);
    let rows = week_over_week(sample);
    let alerts = active_alerts(&rows);
    println!(
        "{}",
        cli::format_history(&totals, &alerts, settings.json, settings.no_color)
    );
}

fn run_project(
    settings: &Settings,
    sample: &UsageSample,
    growth: Option<f64>,
    scenario: Option<&str>,
    months: Option<u32>,
) -> Result<()> {
    let snapshot = snapshot(settings, sample);
    if !snapshot.maturity.ready_for_projection {
        println!("{}", cli::format_not_ready(&snapshot.maturity, settings.json));
        return Ok(());
    }

    let rate = growth
        .or_else(|| scenario.and_then(GrowthScenario::parse).map(GrowthScenario::monthly_rate))
        .unwrap_or(settings.config.growth_rate);
    let months = months.unwrap_or(settings.config.projection_months);

    let projection = project_growth(sample, rate, months, settings.config.credit_cost)?;
    let final_cost = projection
        .monthly_totals()
        .last()
        .map(|t| t.cost)
        .unwrap_or(0.0);
    let band = confidence_interval(
        final_cost,
        snapshot.maturity.confidence_score,
        settings.config.variance_override,
    );

    println!(
        "{}",
        cli::format_growth(&projection, rate, &band, settings.json, settings.no_color)
    );
    Ok(())
}

async fn run_forecast(
    settings: &Settings,
    sample: &UsageSample,
    ml_forecast: Option<PathBuf>,
    months: Option<u32>,
) -> Result<()> {
    let ml_rows = match ml_forecast {
        Some(path) => match CsvForecastSource::new(&path).fetch().await {
            FetchOutcome::Loaded(rows) => Some(rows),
            FetchOutcome::Denied(message) | FetchOutcome::Failed(message) => {
                tracing::warn!(%message, "ML forecast unreadable, using trend fallback");
                None
            }
            outcome => {
                tracing::info!(path = %path.display(), outcome = outcome.label(), "No ML forecast rows");
                None
            }
        },
        None => None,
    };

    let months = months.unwrap_or(settings.config.projection_months);
    let plan = plan_forecast(
        ml_rows.as_deref(),
        sample,
        months,
        settings.config.credit_cost,
    )?;

    println!(
        "{}",
        cli::format_forecast(&plan, settings.json, settings.no_color)
    );
    Ok(())
}

fn parse_scaling(name: &str, user_mult: Option<f64>, usage_mult: Option<f64>) -> Result<ScalingScenario> {
    if name == "custom" {
        return Ok(ScalingScenario::custom(user_mult, usage_mult));
    }
    ScalingScenario::parse(name).with_context(|| format!("Unknown scaling scenario: {}", name))
}

fn run_scale(
    settings: &Settings,
    sample: &UsageSample,
    scenario: &str,
    user_mult: Option<f64>,
    usage_mult: Option<f64>,
) -> Result<()> {
    let snapshot = snapshot(settings, sample);
    if !snapshot.maturity.ready_for_projection {
        println!("{}", cli::format_not_ready(&snapshot.maturity, settings.json));
        return Ok(());
    }

    let scenario = parse_scaling(scenario, user_mult, usage_mult)?;
    let projection = scale_to_production(
        snapshot.run_rate.monthly_cost,
        snapshot.run_rate.avg_daily_users,
        scenario,
    );
    let budget = recommend_budget(
        &projection,
        snapshot.maturity.confidence_score,
        settings.config.variance_override,
        settings.config.budget_buffer,
    );

    println!("{}", cli::format_scaling(&projection, &budget, settings.json));
    Ok(())
}

fn run_personas(
    settings: &Settings,
    sample: &UsageSample,
    personas: Vec<Persona>,
    published_rate: bool,
) {
    let credit_cost = settings.config.credit_cost;
    let rates = service_rates(sample, credit_cost);

    let observed = blended_cost_per_request(&rates);
    let cost_per_request = if published_rate || observed <= 0.0 {
        if !published_rate {
            tracing::warn!("No observed operations, pricing personas at the published rate");
        }
        published_cost_per_request(credit_cost)
    } else {
        observed
    };

    let personas = if personas.is_empty() {
        Persona::defaults()
    } else {
        personas
    };
    let estimate = estimate_personas(&personas, cost_per_request);
    let check = analyst_rate_check(&rates, credit_cost);

    println!(
        "{}",
        cli::format_personas(
            &rates,
            &estimate,
            check.as_ref(),
            settings.json,
            settings.no_color
        )
    );
}

fn run_proposal(
    settings: &Settings,
    sample: &UsageSample,
    output: Option<PathBuf>,
    scenario: Option<&str>,
) -> Result<()> {
    let snapshot = snapshot(settings, sample);
    let mut projections = vec![ProjectionResult::from_snapshot(&snapshot)];

    if let Some(name) = scenario {
        if snapshot.maturity.ready_for_projection {
            let scenario = parse_scaling(name, None, None)?;
            let projection = scale_to_production(
                snapshot.run_rate.monthly_cost,
                snapshot.run_rate.avg_daily_users,
                scenario,
            );
            let budget = recommend_budget(
                &projection,
                snapshot.maturity.confidence_score,
                settings.config.variance_override,
                settings.config.budget_buffer,
            );
            projections.push(ProjectionResult::from_scaling(
                &snapshot.run_rate,
                &projection,
                &budget,
            ));
        } else {
            tracing::warn!("Skipping scaling projection: {}", snapshot.maturity.message);
        }
    }

    let assumptions = default_assumptions(
        snapshot.maturity.days_of_data,
        snapshot.run_rate.avg_daily_users,
        settings.config.credit_cost,
        projections[0].variance_pct,
    );
    let report = assemble_report(&snapshot.maturity, &projections, &assumptions);

    if let Some(dir) = output {
        let bundle = export_bundle(&report, sample, &dir, Local::now().date_naive())
            .with_context(|| format!("Failed to export proposal to {}", dir.display()))?;
        if settings.json {
            println!(
                "{}",
                serde_json::json!({
                    "proposal": bundle.proposal,
                    "summary": bundle.summary,
                    "usage": bundle.usage,
                    "report": bundle.report_json,
                })
            );
        } else {
            println!("Proposal:   {}", bundle.proposal.display());
            println!("Summary:    {}", bundle.summary.display());
            println!("Usage data: {}", bundle.usage.display());
            println!("Report:     {}", bundle.report_json.display());
        }
        return Ok(());
    }

    if settings.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        println!("{}", report.text);
        println!();
        println!("Quick summary:");
        println!("{}", report.quick_summary);
    }
    Ok(())
}

fn run_attribution(settings: &Settings, file: PathBuf, top: usize) -> Result<()> {
    let mut report = LoadReport::new();
    let records = AttributionCsvParser::new()
        .parse_file(&file, &mut report)
        .with_context(|| format!("Failed to read attribution data: {}", file.display()))?;

    for warning in report.warnings() {
        tracing::warn!(source = %warning.source, "{}", warning.message);
    }

    let users = top_users(&records, settings.config.credit_cost, top);
    println!(
        "{}",
        cli::format_attribution(&users, settings.json, settings.no_color)
    );
    Ok(())
}

fn run_functions(
    settings: &Settings,
    file: PathBuf,
    top: usize,
    days: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut report = LoadReport::new();
    let records = FunctionCsvParser::new()
        .parse_file(&file, &mut report)
        .with_context(|| format!("Failed to read function usage data: {}", file.display()))?;

    for warning in report.warnings() {
        tracing::warn!(source = %warning.source, "{}", warning.message);
    }

    let analysis = analyze_functions(
        &records,
        settings.config.credit_cost,
        top,
        days,
        settings.as_of,
    );

    if let Some(dir) = output {
        let path = function_breakdown_path(&dir, Local::now().date_naive());
        export_function_breakdown_csv(&analysis.breakdown, &path)?;
        tracing::info!(path = %path.display(), "Exported function breakdown");
        if !settings.json {
            println!("Breakdown: {}\n", path.display());
        }
    }

    println!(
        "{}",
        cli::format_functions(&analysis, settings.json, settings.no_color)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_months_rejected_beyond_limit() {
        let parsed = Cli::try_parse_from(["creditcast", "project", "--months", "3000000000"]);
        assert!(parsed.is_err());

        let limit = MAX_PROJECTION_MONTHS.to_string();
        let parsed = Cli::try_parse_from(["creditcast", "forecast", "--months", limit.as_str()]);
        assert!(parsed.is_ok());

        let over = (MAX_PROJECTION_MONTHS + 1).to_string();
        assert!(Cli::try_parse_from(["creditcast", "forecast", "--months", over.as_str()]).is_err());
    }

    #[tokio::test]
    async fn test_fetch_cached_loads_through_fallback() {
        let dir = TempDir::new().unwrap();
        let fallback = dir.path().join("fallback.csv");
        std::fs::write(
            &fallback,
            "DATE,SERVICE_TYPE,DAILY_UNIQUE_USERS,TOTAL_OPERATIONS,TOTAL_CREDITS\n\
             2025-06-01,Cortex Search,2,10,1.5\n",
        )
        .unwrap();

        let as_of = NaiveDate::from_ymd_opt(2025, 6, 2);
        let primary = CsvUsageSource::new(dir.path().join("missing.csv")).with_as_of(as_of);
        let secondary = CsvUsageSource::new(&fallback).with_as_of(as_of);
        let config = EstimatorConfig::default();

        let outcome = fetch_cached(TwoStageFetch::new(primary, secondary), &config).await;
        let sample = outcome.into_loaded().unwrap();
        assert_eq!(sample.len(), 1);

        let missing = CsvUsageSource::new(dir.path().join("missing.csv"));
        assert_eq!(fetch_cached(missing, &config).await, FetchOutcome::NotFound);
    }
}
