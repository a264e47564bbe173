//! CLI entry point for the USDA NRFI scorer.
//!
//! Provides subcommands for scoring the branded-food relations and for
//! inspecting the active reference intake table.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use usda_nrfi::{
    NrfiError, ReferenceIntakeTable, ScoringConfig, load_dataset,
    output::{print_pretty, print_reference_json, write_enriched, write_report, write_scores},
    run,
};

#[derive(Parser)]
#[command(name = "usda_nrfi")]
#[command(about = "Score USDA branded food products with the Nutrient Rich Food Index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the NRFI of every product with nutrient measurements
    Score {
        /// Products relation (CSV, optionally .gz)
        #[arg(long, default_value = "data/Products.csv")]
        products: PathBuf,

        /// Nutrient measurements relation (CSV, optionally .gz)
        #[arg(long, default_value = "data/Nutrients.csv")]
        nutrients: PathBuf,

        /// Serving size relation (CSV, optionally .gz)
        #[arg(long, default_value = "data/Serving_size.csv")]
        serving_size: PathBuf,

        /// CSV file to write scores to (.gz to compress)
        #[arg(short, long, default_value = "nrfi.csv")]
        output: PathBuf,

        /// Optional: also write the per-measurement enriched relation
        #[arg(long)]
        enriched_output: Option<PathBuf>,

        /// Optional: JSON reference intake table replacing the built-in USDA DRIs
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Optional: write a JSON run report with diagnostics
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show the reference intake table used for scoring
    Reference {
        /// Optional: JSON reference intake table to validate and show
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Log the table as JSON instead of one event per entry
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/usda_nrfi.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("usda_nrfi.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            products,
            nutrients,
            serving_size,
            output,
            enriched_output,
            reference,
            report,
        } => {
            let table = load_reference(reference.as_deref())?;
            let config = ScoringConfig::default();

            let dataset =
                load_dataset(&products, &nutrients, &serving_size).map_err(abort_reason)?;
            info!(
                products = dataset.products.len(),
                measurements = dataset.measurements.len(),
                serving_sizes = dataset.serving_sizes.len(),
                "Input relations loaded"
            );

            let result = run(&dataset, &table, &config).map_err(abort_reason)?;
            result.diagnostics.report();
            print_pretty(&result.scores);

            write_scores(&output, &result)?;
            if let Some(path) = enriched_output {
                write_enriched(&path, &result, &table, &config)?;
            }
            if let Some(path) = report {
                write_report(&path, &result, &table)?;
            }
        }
        Commands::Reference { reference, json } => {
            let table = load_reference(reference.as_deref())?;

            info!(total = table.len(), "Reference table loaded");
            if json {
                print_reference_json(&table)?;
                return Ok(());
            }
            for entry in table.iter() {
                info!(
                    nutrient_code = %entry.nutrient_code,
                    nutrient_name = %entry.nutrient_name,
                    quantity = entry.quantity,
                    unit = %entry.unit,
                    polarity = ?entry.polarity,
                    "Reference intake"
                );
            }
        }
    }

    Ok(())
}

/// Wraps a fatal pipeline error with the stage that has to be fixed.
fn abort_reason(err: NrfiError) -> anyhow::Error {
    let reason = if err.is_input_error() {
        "input relations are malformed, no output written"
    } else {
        "scoring run aborted, no output written"
    };
    anyhow::Error::new(err).context(reason)
}

/// Loads the reference table from `path`, or the built-in USDA DRIs.
#[tracing::instrument]
fn load_reference(path: Option<&Path>) -> Result<ReferenceIntakeTable> {
    match path {
        Some(path) => Ok(ReferenceIntakeTable::load(path)?),
        None => Ok(ReferenceIntakeTable::usda_dri()),
    }
}
