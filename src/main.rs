use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use healthpulse::config::EngineConfig;
use healthpulse::dashboard::DashboardReport;
use healthpulse::error::AnalyticsError;
use healthpulse::logging::{init_logging, LogLevel};
use healthpulse::models::{Impact, NutritionGoal, MAX_WINDOW_DAYS};
use healthpulse::nutrition::TargetOverrides;
use healthpulse::scoring::Trend;
use healthpulse::service::AnalyticsService;
use healthpulse::store::MemoryStore;
use healthpulse::WeightedFactor;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabled::{settings::Style, Table, Tabled};
use uuid::Uuid;

/// HealthPulse - Health Analytics CLI
///
/// Recovery, readiness and wellness scores, nutrition targets, progressive
/// overload suggestions and metric correlations from a health data snapshot.
#[derive(Parser)]
#[command(name = "healthpulse")]
#[command(author = "HealthPulse Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Health Analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON data snapshot to analyze
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// User to analyze (defaults to the only user in the snapshot)
    #[arg(short, long)]
    user: Option<Uuid>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recovery score with contributing factors
    Recovery,

    /// Training readiness and recommended intensity
    Readiness,

    /// Overall wellness score and trend
    Wellness,

    /// Relationships discovered between tracked metrics
    Correlations,

    /// Next-session weight suggestions
    Progression {
        /// Exercise names
        #[arg(short, long, required = true, num_args = 1..)]
        exercise: Vec<String>,
    },

    /// Daily nutrition targets and today's adherence
    Nutrition {
        /// Override the profile goal (lose_weight, build_muscle, maintain, general_health)
        #[arg(short, long)]
        goal: Option<String>,
    },

    /// Sleep summary
    Sleep {
        /// Analysis period in days (defaults to sleep.analysis_days)
        #[arg(short = 'p', long, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS))]
        days: Option<i64>,
    },

    /// Import metric samples from CSV into the data snapshot
    Import {
        /// CSV file with metric_type,value,timestamp[,source] columns
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Composite dashboard
    Dashboard,

    /// Configure application settings
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct FactorRow {
    #[tabled(rename = "Factor")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Impact")]
    impact: String,
}

impl From<&WeightedFactor> for FactorRow {
    fn from(factor: &WeightedFactor) -> Self {
        Self {
            name: factor.name.clone(),
            value: format!("{:.1}", factor.value),
            score: format!("{:.1}", factor.score),
            impact: colored_impact(factor.impact),
        }
    }
}

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Metric")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl LabelRow {
    fn new(label: &str, value: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

fn colored_impact(impact: Impact) -> String {
    match impact {
        Impact::Positive => "positive".green().to_string(),
        Impact::Negative => "negative".red().to_string(),
        Impact::Neutral => "neutral".yellow().to_string(),
    }
}

fn colored_score(score: f64) -> ColoredString {
    let text = format!("{:.1}", score);
    if score >= 80.0 {
        text.green().bold()
    } else if score >= 50.0 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_user(store: &MemoryStore, requested: Option<Uuid>) -> Result<Uuid> {
    if let Some(user_id) = requested {
        return Ok(user_id);
    }
    let mut users = store.users.keys();
    match (users.next(), users.next()) {
        (Some(user_id), None) => Ok(*user_id),
        (None, _) => bail!("The data snapshot holds no users; pass --data <snapshot.json>"),
        _ => bail!("The data snapshot holds several users; pass --user <uuid>"),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), describe_error(&err));
            ExitCode::FAILURE
        }
    }
}

/// Message shown for a failed command
fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AnalyticsError>() {
        Some(analytics) => {
            tracing::debug!(
                severity = ?analytics.severity(),
                retryable = analytics.is_retryable(),
                error = %analytics,
                "Command failed"
            );
            let mut message = analytics.user_message();
            if analytics.is_retryable() {
                message.push_str(" (temporary, retry the command)");
            }
            message
        }
        None => format!("{:#}", err),
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::load_or_default(cli.config.as_deref())?;
    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&config.logging)?;

    if let Commands::Config { show, init } = &cli.command {
        return handle_config(&config, cli.config.clone(), *show, *init, cli.json);
    }

    if let Commands::Import { file } = &cli.command {
        return handle_import(cli.data.as_deref(), cli.user, file);
    }

    let mut store = match &cli.data {
        Some(path) => MemoryStore::load_from_file(path)?,
        None => MemoryStore::new(),
    };
    let user_id = resolve_user(&store, cli.user)?;

    if let Commands::Nutrition { goal: Some(goal) } = &cli.command {
        if let Some(profile) = store.user_mut(user_id).profile.as_mut() {
            profile.nutrition_goal = NutritionGoal::from_name(goal);
        }
    }

    let service = AnalyticsService::new(store, config).context("Invalid engine configuration")?;
    let now = Utc::now();

    match cli.command {
        Commands::Recovery => {
            let recovery = service.recovery(user_id, now)?;
            if cli.json {
                return print_json(&recovery);
            }
            println!("{}", "Recovery".blue().bold());
            println!(
                "  Score: {}  ({}, confidence {:.0}%)",
                colored_score(recovery.score),
                recovery.status,
                recovery.confidence * 100.0
            );
            print_table(
                recovery
                    .factors_by_score()
                    .into_iter()
                    .map(FactorRow::from)
                    .collect(),
            );
            for tip in &recovery.recommendations {
                println!("  {} {}", "•".cyan(), tip);
            }
        }

        Commands::Readiness => {
            let readiness = service.readiness(user_id, now)?;
            if cli.json {
                return print_json(&readiness);
            }
            println!("{}", "Readiness".blue().bold());
            println!(
                "  Score: {}  (recommended intensity: {})",
                colored_score(readiness.score),
                readiness.recommended_intensity.to_string().bold()
            );
            print_table(readiness.factors.values().map(FactorRow::from).collect());
            println!("  {}", readiness.recommendation);
            println!(
                "  Suggested: {}",
                readiness.suggested_workout_types.join(", ")
            );
        }

        Commands::Wellness => {
            let wellness = service.wellness(user_id, now)?;
            if cli.json {
                return print_json(&wellness);
            }
            let trend = match wellness.trend {
                Trend::Improving => "improving".green(),
                Trend::Stable => "stable".normal(),
                Trend::Declining => "declining".red(),
            };
            println!("{}", "Wellness".blue().bold());
            println!(
                "  Score: {}  (trend {}, {:+.1} vs baseline)",
                colored_score(wellness.overall_score),
                trend,
                wellness.comparison_to_baseline
            );
            print_table(
                wellness
                    .components
                    .iter()
                    .map(|(name, score)| LabelRow::new(name, format!("{:.1}", score)))
                    .collect(),
            );
        }

        Commands::Correlations => {
            let insights = service.correlations(user_id, now)?;
            if cli.json {
                return print_json(&insights);
            }
            println!("{}", "Correlations".blue().bold());
            if insights.is_empty() {
                println!("  {}", "Not enough data to discover correlations yet.".dimmed());
            }
            for insight in &insights {
                println!(
                    "  {:+.3}  {} {}",
                    insight.correlation,
                    insight.insight,
                    format!("({} points)", insight.data_points).dimmed()
                );
            }
        }

        Commands::Progression { exercise } => {
            let suggestions = service.progression(user_id, &exercise)?;
            if cli.json {
                return print_json(&suggestions);
            }
            println!("{}", "Progression".blue().bold());
            let rows = suggestions
                .values()
                .map(|s| {
                    vec![
                        s.exercise.clone(),
                        s.status.to_string(),
                        s.suggested_weight_kg
                            .map(|w| format!("{} kg", w))
                            .unwrap_or_else(|| "-".to_string()),
                        s.reason.clone(),
                    ]
                })
                .collect::<Vec<_>>();
            let mut builder = tabled::builder::Builder::default();
            builder.push_record(["Exercise", "Status", "Suggested", "Reason"]);
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }

        Commands::Nutrition { .. } => {
            let targets = service.nutrition_targets(user_id, now, &TargetOverrides::default())?;
            let score = service.nutrition_score(user_id, now.date_naive(), now)?;
            if cli.json {
                return print_json(&serde_json::json!({ "targets": targets, "score": score }));
            }
            println!("{}", "Nutrition targets".blue().bold());
            print_table(vec![
                LabelRow::new("BMR", format!("{:.0} kcal", targets.bmr)),
                LabelRow::new("TDEE", format!("{:.0} kcal", targets.tdee)),
                LabelRow::new("Calories", format!("{:.0} kcal", targets.calorie_target)),
                LabelRow::new("Protein", format!("{:.0} g", targets.protein_g)),
                LabelRow::new("Carbs", format!("{:.0} g", targets.carbs_g)),
                LabelRow::new("Fat", format!("{:.0} g", targets.fat_g)),
            ]);
            println!(
                "  Today's adherence: {}  ({} days logged this week)",
                colored_score(score.overall_score),
                score.days_logged
            );
        }

        Commands::Sleep { days } => {
            let days = days.unwrap_or(service.config().sleep.analysis_days);
            let sleep = service.sleep_analytics(user_id, days, now)?;
            if cli.json {
                return print_json(&sleep);
            }
            println!("{}", format!("Sleep ({} days)", days).blue().bold());
            print_table(vec![
                LabelRow::new("Nights logged", sleep.nights_logged),
                LabelRow::new("Avg duration", format!("{:.1} h", sleep.avg_duration_hours)),
                LabelRow::new("Avg score", format!("{:.1}", sleep.avg_sleep_score)),
                LabelRow::new("Sleep debt", format!("{:.1} h", sleep.total_sleep_debt_hours)),
                LabelRow::new("Consistency", format!("{:.1}", sleep.consistency_score)),
                LabelRow::new("Trend", sleep.trend),
            ]);
        }

        Commands::Dashboard => {
            let report = service.dashboard(user_id, now);
            if cli.json {
                return print_json(&report);
            }
            print_dashboard(&report);
        }

        Commands::Config { .. } | Commands::Import { .. } => {}
    }

    Ok(())
}

fn print_dashboard(report: &DashboardReport) {
    let recovery = &report.enhanced_recovery;
    println!("{}", "Dashboard".blue().bold());
    println!(
        "  Recovery:  {}  ({})",
        colored_score(recovery.score),
        recovery.status
    );
    println!("  {}", recovery.primary_recommendation);
    if let Some(hours) = recovery.estimated_full_recovery_hours {
        println!("  Full recovery in ~{} h", hours);
    }
    println!(
        "  Readiness: {}  ({})",
        colored_score(report.readiness.score),
        report.readiness.recommended_intensity
    );

    let progress = &report.progress;
    println!(
        "  Volume this week: {:.0} kg ({:+.1}%)",
        progress.total_volume_week, progress.volume_trend_pct
    );
    print_table(
        progress
            .key_lifts
            .iter()
            .map(|l| {
                LabelRow::new(
                    &l.exercise_name,
                    format!("{} kg ({:+}, {:+.1}%)", l.current_kg, l.change_kg, l.change_percent),
                )
            })
            .collect(),
    );

    let weekly = &report.weekly_summary;
    println!(
        "  Week: {}/{} workouts, sleep {:.1}, nutrition {:.0}%",
        weekly.workouts_completed,
        weekly.workouts_planned,
        weekly.avg_sleep_score,
        weekly.nutrition_adherence_pct
    );
    for highlight in &weekly.highlights {
        println!("  {} {}", "★".yellow(), highlight);
    }

    println!("{}", "Recommendations".blue().bold());
    for rec in &report.recommendations {
        println!("  {} {}: {}", format!("[{}]", rec.category).cyan(), rec.title.bold(), rec.message);
    }

    if report.is_degraded() {
        println!(
            "{}",
            format!("  Unavailable: {}", report.degraded_sections.join(", ")).dimmed()
        );
    }
}

fn handle_import(data: Option<&Path>, user: Option<Uuid>, file: &Path) -> Result<()> {
    let Some(data) = data else {
        bail!("Importing needs a snapshot to write to; pass --data <snapshot.json>");
    };

    let mut store = if data.exists() {
        MemoryStore::load_from_file(data)?
    } else {
        MemoryStore::new()
    };
    let user_id = match user {
        None if store.users.is_empty() => Uuid::new_v4(),
        requested => resolve_user(&store, requested)?,
    };

    let count = store.import_samples_csv(user_id, file)?;
    store.save_to_file(data)?;

    println!(
        "{}",
        format!("✓ Imported {} samples for user {}", count, user_id).green()
    );
    Ok(())
}

fn handle_config(
    config: &EngineConfig,
    path: Option<PathBuf>,
    show: bool,
    init: bool,
    json: bool,
) -> Result<()> {
    if init {
        let path = path.unwrap_or_else(EngineConfig::default_config_path);
        EngineConfig::default().save_to_file(&path)?;
        println!(
            "{}",
            format!("✓ Wrote default configuration to {}", path.display()).green()
        );
    }

    if show || !init {
        if json {
            print_json(config)?;
        } else {
            println!("{}", toml::to_string_pretty(config)?);
        }
    }

    Ok(())
}
