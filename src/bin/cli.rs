//! regwatch CLI
//!
//! Thin local runner over the change-detection engine: load a source list,
//! run a batch, stream per-source results to a timestamped JSONL file.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use regwatch::{
    error::{AppError, Result},
    models::{Config, RunOutcome, Source},
    pipeline::Pipeline,
    registry::SourceRegistry,
};

/// regwatch - Regulatory page change monitor
#[derive(Parser, Debug)]
#[command(name = "regwatch", version, about = "Regulatory page change monitor")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "regwatch.toml")]
    config: PathBuf,

    /// Directory holding per-source cache records
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a batch over the source list
    Run {
        /// Path to the source list (JSON array of sources)
        #[arg(short, long)]
        sources: PathBuf,

        /// Only run sources with one of these jurisdiction tags
        #[arg(short, long)]
        jurisdiction: Vec<String>,

        /// Print only sources that changed
        #[arg(long)]
        only_updated: bool,

        /// Directory for JSONL result files
        #[arg(long, default_value = "data/runs")]
        out: PathBuf,
    },

    /// Validate configuration and source list
    Validate {
        /// Path to the source list (JSON array of sources)
        #[arg(short, long)]
        sources: PathBuf,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load the source list, deriving missing ids.
fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)?;
    let mut sources: Vec<Source> = serde_json::from_str(&content)?;
    for source in &mut sources {
        source.ensure_id();
    }
    Ok(sources)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    match cli.command {
        Command::Run {
            sources,
            jurisdiction,
            only_updated,
            out,
        } => {
            let source_list = load_sources(&sources)?;
            // Registry construction rejects duplicate ids up front.
            let registry = SourceRegistry::new(source_list)?;
            log::info!("Loaded {} source(s) from {}", registry.len(), sources.display());

            let pipeline = Pipeline::with_defaults(config, &cli.cache_dir)?;
            let report = pipeline
                .run_batch(registry.sources(), |s| {
                    jurisdiction.is_empty()
                        || s.jurisdiction
                            .as_deref()
                            .is_some_and(|j| jurisdiction.iter().any(|want| want.as_str() == j))
                })
                .await;

            fs::create_dir_all(&out)?;
            let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
            let outfile = out.join(format!("scrape_{stamp}.jsonl"));
            let mut fh = fs::File::create(&outfile)?;

            for outcome in &report.outcomes {
                match outcome {
                    RunOutcome::Ok(result) => {
                        if result.updated {
                            log::info!("UPDATED {} ({})", result.url, result.diff_summary);
                        } else if !only_updated {
                            log::info!("{} (no change)", result.url);
                        }
                    }
                    RunOutcome::Error(err) => {
                        log::error!("{} failed in {}: {}", err.url, err.phase, err.message);
                    }
                }
                let line = serde_json::to_string(outcome)?;
                writeln!(fh, "{line}")?;
            }

            log::info!(
                "Done: ok={} updated={} failed={} skipped={}",
                report.succeeded,
                report.updated,
                report.errored,
                report.skipped
            );
            log::info!("Output -> {}", outfile.display());

            if !report.is_consistent() {
                return Err(AppError::validation("batch report counts are inconsistent"));
            }
        }

        Command::Validate { sources } => {
            log::info!("Validating configuration and sources...");
            let source_list = load_sources(&sources)?;
            let registry = SourceRegistry::new(source_list)?;
            if registry.is_empty() {
                return Err(AppError::validation("source list is empty"));
            }
            log::info!("OK: config valid, {} source(s) registered", registry.len());
        }
    }

    Ok(())
}
