//! CLI definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use omnivook_builder::BuildState;
use omnivook_core::packager::PackageOutcome;
use omnivook_core::pipeline::{
    self, BookOutcome, Mode, ProgressReporter, RunConfig, RunSummary,
};
use omnivook_fetcher::{ArticleService, ExportOptions, OmnivoreClient, SearchFilter};
use omnivook_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// omnivook: compile recently saved Omnivore articles into an ebook.
#[derive(Parser)]
#[command(
    name = "omnivook",
    version,
    about = "Compile recently saved Omnivore articles into an ebook.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Only articles saved on or after this date (YYYY-MM-DD). Defaults to yesterday.
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Labels articles must carry (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub label: Vec<String>,

    /// Labels articles must not carry (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude_label: Vec<String>,

    /// Labels to add to every exported article (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub add_label: Vec<String>,

    /// Extra search clause appended verbatim, e.g. "language:spanish".
    #[arg(long)]
    pub extra_filter: Option<String>,

    /// Output format, used as the artifact extension.
    #[arg(short, long, default_value = "epub")]
    pub output_format: String,

    /// Archive exported articles.
    #[arg(long)]
    pub archive: bool,

    /// Operation mode.
    #[arg(long, value_enum, default_value_t = RunMode::All)]
    pub mode: RunMode,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum RunMode {
    /// Retrieve articles, build the book, remove the source directory.
    All,
    /// Only retrieve articles into the source directory.
    Retrieve,
    /// Only build the book from an existing source directory.
    Build,
}

impl From<RunMode> for Mode {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::All => Mode::All,
            RunMode::Retrieve => Mode::Retrieve,
            RunMode::Build => Mode::Build,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "omnivook=info",
        1 => "omnivook=debug",
        _ => "omnivook=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
        None => cmd_run(&cli).await,
    }
}

async fn cmd_run(cli: &Cli) -> Result<()> {
    let config = load_config()?;
    let today = Local::now().date_naive();
    let run_config = run_config(cli, &config, today);

    info!(
        mode = ?run_config.mode,
        since = %run_config.filter.since,
        format = %run_config.output_format,
        "starting omnivook"
    );

    // Only retrieval talks to the service; `build` works offline.
    let client = if run_config.mode.retrieves() {
        Some(OmnivoreClient::from_env(&config.api)?)
    } else {
        None
    };

    let reporter = CliProgress::new();
    let summary = pipeline::run(
        &run_config,
        client.as_ref().map(|c| c as &dyn ArticleService),
        &reporter,
    )
    .await?;

    print_summary(&summary);
    Ok(())
}

/// Merge the CLI flags into the loaded configuration.
fn run_config(cli: &Cli, config: &AppConfig, today: NaiveDate) -> RunConfig {
    let since = cli.since.unwrap_or(today - Duration::days(1));

    RunConfig {
        mode: cli.mode.into(),
        filter: SearchFilter {
            since,
            labels: clean_list(&cli.label),
            exclude_labels: clean_list(&cli.exclude_label),
            extra: cli
                .extra_filter
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        },
        export: ExportOptions {
            add_labels: clean_list(&cli.add_label),
            archive: cli.archive,
        },
        output_format: cli.output_format.clone(),
        output_dir: PathBuf::from("."),
        build: config.build.clone(),
        today,
    }
}

/// Trim comma-separated values and drop the empty ones.
fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("  Articles: {}", summary.articles);
    match &summary.book {
        None => {}
        Some(BookOutcome::NoArticles) => println!("  Book:     nothing to compile"),
        Some(BookOutcome::Built { state, package }) => {
            match state {
                BuildState::Converged { attempts } => {
                    println!("  Build:    clean after {attempts} attempt(s)")
                }
                BuildState::Exhausted { attempts, remaining } => println!(
                    "  Build:    {} warning(s) left after {attempts} attempts",
                    remaining.len()
                ),
                BuildState::Attempting(_) => {}
            }
            match package {
                PackageOutcome::Packaged(path) => println!("  Ebook:    {}", path.display()),
                PackageOutcome::Missing(path) => {
                    println!("  Ebook:    not generated ({} missing)", path.display())
                }
            }
        }
    }
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article_saved(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Saved [{current}/{total}] {}", path.display()));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
