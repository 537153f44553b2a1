//! Punchcard CLI - timesheet submission automation
//!
//! Usage:
//!   punchcard run <schedule.csv>        Submit every day in the schedule
//!   punchcard run <schedule.csv> --dry-run   Validate and record without submitting
//!   punchcard validate <schedule.csv>   Check the schedule, print every error
//!   punchcard template                  Generate a starter schedule CSV
//!   punchcard doctor                    Check the browser connection
//!   punchcard retry <schedule.csv>      Re-run only previously failed dates

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use punchcard_browser::Session;
use punchcard_core::PunchcardConfig;
use punchcard_engine::{BatchDriver, ResultLog, Summary};
use punchcard_ingest::{write_template, Schedule};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "punchcard")]
#[command(author, version, about = "Timesheet submission automation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(long, default_value = "punchcard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every day in a schedule
    Run {
        /// Schedule CSV file
        schedule: PathBuf,

        /// Validate and record outcomes without touching the browser
        #[arg(long)]
        dry_run: bool,

        /// Only process days on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only process days on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Override the configured DevTools port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a schedule and print every error found
    Validate {
        /// Schedule CSV file
        schedule: PathBuf,
    },

    /// Generate a starter schedule CSV (weekdays only)
    Template {
        /// Calendar days to cover
        #[arg(long, default_value = "5")]
        days: u32,

        /// First date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Directory to write into
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Check the connection to the browser and the page state
    Doctor {
        /// Override the configured DevTools port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Re-run only the dates whose latest result is a failure
    Retry {
        /// Schedule CSV file
        schedule: PathBuf,

        /// Results CSV from the earlier run (defaults to <results_dir>/results.csv)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Override the configured DevTools port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = PunchcardConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Run {
            schedule,
            dry_run,
            from,
            to,
            port,
        } => cmd_run(config, schedule, dry_run, from, to, port).await,
        Commands::Validate { schedule } => cmd_validate(schedule),
        Commands::Template {
            days,
            start_date,
            output,
        } => cmd_template(days, start_date, output),
        Commands::Doctor { port } => cmd_doctor(config, port).await,
        Commands::Retry {
            schedule,
            results,
            port,
        } => cmd_retry(config, schedule, results, port).await,
    }
}

async fn cmd_run(
    mut config: PunchcardConfig,
    schedule_path: PathBuf,
    dry_run: bool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(port) = port {
        config.debugger_port = port;
    }

    let schedule = Schedule::load(&schedule_path)?;
    let records = schedule.filter_range(from, to);
    if records.is_empty() {
        bail!("no schedule records in the selected date range");
    }
    info!("Processing {} day(s) from {}", records.len(), schedule_path.display());

    let session = connect(&config, dry_run).await?;
    let mut driver = BatchDriver::new(session, config.clone());
    let outcome = driver.process_all(&records, dry_run).await;

    let results_path = config.results_dir.join("results.csv");
    driver.results().write_csv(&results_path)?;
    print_summary(driver.results().summary(), &results_path);

    match outcome {
        Ok(summary) if summary.overall_success() => Ok(()),
        Ok(summary) => bail!("{} day(s) failed", summary.failure),
        Err(e) => Err(e).context("batch aborted"),
    }
}

fn cmd_validate(schedule_path: PathBuf) -> Result<()> {
    let errors = Schedule::validate(&schedule_path)?;
    if errors.is_empty() {
        println!("{}: OK", schedule_path.display());
        return Ok(());
    }
    println!("{}: {} error(s)", schedule_path.display(), errors.len());
    for error in &errors {
        println!("  {}", error);
    }
    bail!("schedule validation failed");
}

fn cmd_template(days: u32, start_date: Option<NaiveDate>, output: PathBuf) -> Result<()> {
    let start = start_date.unwrap_or_else(|| Local::now().date_naive());
    let path = write_template(&output, start, days)?;
    println!("Created template: {}", path.display());
    Ok(())
}

async fn cmd_doctor(mut config: PunchcardConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.debugger_port = port;
    }

    println!("Connecting to browser on port {}...", config.debugger_port);
    let session = Session::connect(config.debugger_port).await?;
    println!("  browser connection: ok");

    session
        .wait_for_page_load(Duration::from_secs(config.page_load_timeout_secs))
        .await?;
    println!("  page loaded: ok");
    println!("  url:   {}", session.current_url().await?);
    println!("  title: {}", session.title().await?);

    let forms = session
        .evaluate("document.querySelectorAll('form').length")
        .await?;
    let inputs = session
        .evaluate("document.querySelectorAll('input, select').length")
        .await?;
    println!("  form elements:  {}", forms.as_u64().unwrap_or(0));
    println!("  input elements: {}", inputs.as_u64().unwrap_or(0));

    if inputs.as_u64().unwrap_or(0) == 0 {
        bail!("page has no input elements; is the timesheet open?");
    }
    println!("Connection check passed");
    Ok(())
}

async fn cmd_retry(
    mut config: PunchcardConfig,
    schedule_path: PathBuf,
    results: Option<PathBuf>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(port) = port {
        config.debugger_port = port;
    }

    let results_path = results.unwrap_or_else(|| config.results_dir.join("results.csv"));
    let log = ResultLog::load_csv(&results_path)
        .with_context(|| format!("loading {}", results_path.display()))?;
    let failed = log.failed_dates();
    if failed.is_empty() {
        println!("No failed dates in {}", results_path.display());
        return Ok(());
    }
    info!("Retrying {} failed date(s)", failed.len());

    let schedule = Schedule::load(&schedule_path)?;
    let session = connect(&config, false).await?;
    let mut driver = BatchDriver::with_log(session, config.clone(), log);
    let summary = driver.retry_failed(schedule.records()).await?;

    driver.results().write_csv(&results_path)?;
    print_summary(summary, &results_path);

    if summary.overall_success() {
        Ok(())
    } else {
        bail!("{} day(s) still failing", summary.failure)
    }
}

async fn connect(config: &PunchcardConfig, dry_run: bool) -> Result<Session> {
    let session = Session::connect(config.debugger_port).await.with_context(|| {
        format!(
            "connecting to Chrome on port {} (start it with --remote-debugging-port)",
            config.debugger_port
        )
    })?;
    if !dry_run {
        session
            .wait_for_page_load(Duration::from_secs(config.page_load_timeout_secs))
            .await?;
    }
    Ok(session)
}

fn print_summary(summary: Summary, results_path: &std::path::Path) {
    println!("Run summary:");
    println!("  success: {}", summary.success);
    println!("  failure: {}", summary.failure);
    println!("  dry-run: {}", summary.dry_run);
    println!("  skipped: {}", summary.skipped);
    println!("Results written to {}", results_path.display());
}
