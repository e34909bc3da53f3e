//! Term emergence forecasting CLI
//!
//! Loads a term-count matrix, classifies terms by emergence, and forecasts
//! their counts with the predictor catalogue.

mod config;
mod html;
mod input;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{EmtechConfig, LogFormat};
use emtech_lib::{EmergenceLabel, EvaluationRun, ForecastEngine, RunSettings};
use output::{OutputFormat, ReportFormat};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Term emergence forecasting CLI
#[derive(Parser)]
#[command(name = "emtech")]
#[command(author, version, about = "Classify and forecast emerging terms", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/emtech/config.toml when present)
    #[arg(long, global = true, env = "EMTECH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format on stderr (overrides configuration)
    #[arg(long, global = true, value_parser = ["json", "plain"])]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast term counts for the selected emergence labels
    Forecast(ForecastArgs),

    /// Label each term as emergent, stationary or declining
    Classify(ClassifyArgs),

    /// List the predictor catalogue with numeric codes
    Predictors {
        /// Output format
        #[arg(long, short, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Args)]
pub struct ForecastArgs {
    /// Term-count matrix (.json wide matrix or .csv term,date,count records)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Predictor names, aliases or codes (0 or All selects every predictor)
    #[arg(long, short, value_delimiter = ',', default_value = "Linear")]
    pub predictors: Vec<String>,

    /// Emergence labels to report on (defaults to emergent unless --terms is given)
    #[arg(long, short, value_delimiter = ',')]
    pub emergence: Option<Vec<String>>,

    /// Evaluate these terms instead of every extracted term
    #[arg(long, short, value_delimiter = ',')]
    pub terms: Option<Vec<String>>,

    /// Skip emergence filtering
    #[arg(long, conflicts_with = "emergence")]
    pub unfiltered: bool,

    /// Forecast horizon in quarters
    #[arg(long)]
    pub steps_ahead: Option<usize>,

    /// Top terms per emergence label
    #[arg(long)]
    pub nterms: Option<usize>,

    /// Minimum occurrences a term needs in at least one quarter
    #[arg(long)]
    pub minimum_per_quarter: Option<u64>,

    /// Hold out the last steps and report forecast errors
    #[arg(long)]
    pub test: bool,

    /// Normalise counts by total corpus activity per quarter
    #[arg(long)]
    pub normalised: bool,

    /// Include the fitted curve over the training range
    #[arg(long)]
    pub curves: bool,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write Prometheus metrics in text exposition format after the run
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Term-count matrix (.json wide matrix or .csv term,date,count records)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Minimum occurrences a term needs in at least one quarter
    #[arg(long)]
    pub minimum_per_quarter: Option<u64>,

    /// Classify normalised rather than raw counts
    #[arg(long)]
    pub normalised: bool,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Write the listing to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = EmtechConfig::load(cli.config.as_deref())?;
    if let Some(format) = &cli.log_format {
        config.log_format = if format == "plain" {
            LogFormat::Plain
        } else {
            LogFormat::Json
        };
    }
    init_tracing(config.log_format);

    match cli.command {
        Commands::Forecast(args) => forecast(&config, args).await,
        Commands::Classify(args) => classify(&config, args),
        Commands::Predictors { format } => output::emit(&output::render_predictors(format)?, None),
    }
}

async fn forecast(config: &EmtechConfig, args: ForecastArgs) -> Result<()> {
    let emergence = match (args.emergence, &args.terms) {
        _ if args.unfiltered => Vec::new(),
        (Some(labels), _) => labels,
        (None, Some(_)) => Vec::new(),
        (None, None) => vec![EmergenceLabel::Emergent.to_string()],
    };
    let settings = RunSettings {
        predictors: args.predictors,
        terms: args.terms,
        emergence,
        normalized: args.normalised,
        train_test: args.test,
        curves: args.curves,
        steps_ahead: args.steps_ahead.unwrap_or(config.steps_ahead),
        min_per_bucket: args.minimum_per_quarter.unwrap_or(config.minimum_per_quarter),
        nterms: args.nterms.unwrap_or(config.nterms),
    };
    let run = EvaluationRun::new(&settings).context("Invalid run configuration")?;
    let engine = ForecastEngine::new(config.engine_config())?;

    let matrix = input::load_matrix(&args.input)?;
    info!(
        input = %args.input.display(),
        terms = matrix.num_terms(),
        quarters = matrix.quarters().len(),
        "Loaded term-count matrix"
    );

    let report = engine.run(&matrix, &run).await?;

    let rendered = match args.format {
        ReportFormat::Json => output::render_json(&report)?,
        ReportFormat::Html => html::render_html(&report),
        ReportFormat::Table => {
            if args.output.is_some() {
                colored::control::set_override(false);
            }
            output::render_report_tables(&report)
        }
    };
    output::emit(&rendered, args.output.as_deref())?;

    if let Some(path) = &args.metrics_file {
        let text = engine.metrics().render()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    if let Some(path) = &args.output {
        output::print_success(&format!(
            "Wrote {} results ({} failed) to {}",
            report.completed() + report.failed(),
            report.failed(),
            path.display()
        ));
    }
    Ok(())
}

fn classify(config: &EmtechConfig, args: ClassifyArgs) -> Result<()> {
    let engine = ForecastEngine::new(config.engine_config())?;
    let matrix = input::load_matrix(&args.input)?;
    let classifications = engine.classify(
        &matrix,
        args.minimum_per_quarter.unwrap_or(config.minimum_per_quarter),
        args.normalised,
    );
    if args.output.is_some() {
        colored::control::set_override(false);
    }
    let rendered = output::render_classifications(&classifications, args.format)?;
    output::emit(&rendered, args.output.as_deref())
}
