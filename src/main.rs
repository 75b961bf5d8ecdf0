//! CLI entry point for the bikeshare explorer.
//!
//! Without a subcommand an interactive menu is shown. `analyze` runs one
//! analysis from flags, `test` sweeps every city through every filter.

use std::ffi::OsStr;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bikeshare_explorer::analyzers::analyzer::{analyze, analyze_dataset};
use bikeshare_explorer::analyzers::timing::timed;
use bikeshare_explorer::analyzers::types::Report;
use bikeshare_explorer::config::{Catalog, Configuration, sweep};
use bikeshare_explorer::filter::FilterKind;
use bikeshare_explorer::output::{write_json, write_report};
use bikeshare_explorer::parser::load_city;
use bikeshare_explorer::selection::{LinePrompt, Prompt, run_session};
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::{Input, theme::ColorfulTheme};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_explorer")]
#[command(
    about = "Analyzes bikeshare data of a given city and prints various stats",
    long_about = None
)]
struct Cli {
    /// Directory holding the city CSV files [env: BIKESHARE_DATA_DIR]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON file listing cities and offered months
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every city through no filter, each month, each weekday and each pair
    Test,
    /// Analyze one city with the given filter
    Analyze {
        /// The name of the city to analyze (defaults to the first known city)
        #[arg(long)]
        city: Option<String>,

        /// The filter to use
        #[arg(long, value_enum, ignore_case = true, default_value_t = FilterKind::None)]
        filter: FilterKind,

        /// Month name, required by the Month and Both filters
        #[arg(long)]
        month: Option<String>,

        /// Weekday name, required by the Day and Both filters
        #[arg(long)]
        weekday: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bikeshare_explorer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_explorer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(io::stderr)
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

    let catalog = match &cli.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        std::env::var("BIKESHARE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    info!(data_dir = %data_dir.display(), cities = catalog.cities().len(), "Starting");

    match cli.command {
        None => {
            if io::stdin().is_terminal() {
                let mut prompt = TerminalPrompt::default();
                interactive(&catalog, &mut prompt, &data_dir, cli.format)?;
            } else {
                let mut prompt = LinePrompt::new(io::stdin().lock());
                interactive(&catalog, &mut prompt, &data_dir, cli.format)?;
            }
        }
        Some(Commands::Analyze {
            city,
            filter,
            month,
            weekday,
        }) => {
            let config = Configuration::from_args(
                &catalog,
                city.as_deref(),
                filter,
                month.as_deref(),
                weekday.as_deref(),
            )?;
            info!(config = %config.describe(), "Resolved configuration");
            let report = analyze(&config, &data_dir)?;
            emit(&mut io::stdout(), &report, cli.format)?;
        }
        Some(Commands::Test) => {
            run_sweep(&catalog, &data_dir, cli.format)?;
        }
    }

    Ok(())
}

/// Line editor prompt; Ctrl-C surfaces as an `Interrupted` error.
#[derive(Default)]
struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl Prompt for TerminalPrompt {
    fn read_answer(&mut self, prompt: &str) -> io::Result<Option<String>> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map(Some)
            .map_err(|dialoguer::Error::IO(e)| e)
    }
}

fn interactive<P: Prompt>(
    catalog: &Catalog,
    prompt: &mut P,
    data_dir: &Path,
    format: Format,
) -> Result<()> {
    let mut out = io::stdout();
    run_session(catalog, prompt, &mut out, |config, out| {
        let report = analyze(config, data_dir)?;
        emit(out, &report, format)
    })
}

fn emit<W: Write>(out: &mut W, report: &Report, format: Format) -> Result<()> {
    match format {
        Format::Text => write_report(out, report)?,
        Format::Json => write_json(out, report)?,
    }
    out.flush()?;
    Ok(())
}

/// Loads each city once and runs every sweep configuration over it.
/// A failed run is logged and counted; the sweep carries on.
#[tracing::instrument(skip_all, fields(data_dir = %data_dir.display()))]
fn run_sweep(catalog: &Catalog, data_dir: &Path, format: Format) -> Result<()> {
    let mut out = io::stdout();
    let mut runs = 0usize;
    let mut failures = 0usize;

    for city in catalog.cities() {
        writeln!(out, "{}", "-".repeat(80))?;
        writeln!(out, "Analyzing data for city \"{}\" ..", city.name)?;

        let path = city.path(data_dir);
        let (dataset, load_secs) = timed(|| load_city(&path));
        let dataset = dataset.with_context(|| format!("loading {}", path.display()))?;

        for config in sweep(catalog, city) {
            runs += 1;
            writeln!(out, "{}", "-".repeat(80))?;
            writeln!(out, "Analyzing {} ..", config.describe())?;
            match analyze_dataset(&dataset, &config) {
                Ok(mut report) => {
                    report.load_secs = load_secs;
                    emit(&mut out, &report, format)?;
                }
                Err(e) => {
                    failures += 1;
                    error!(error = %format!("{e:#}"), config = %config.describe(), "Run failed");
                    writeln!(out, "Analysis failed: {e:#}")?;
                }
            }
        }
    }

    if failures > 0 {
        warn!(runs, failures, "Sweep finished with failed runs");
    } else {
        info!(runs, "Sweep finished");
    }
    Ok(())
}
