use std::path::PathBuf;

use clap::Parser;
use shelfsheet::enrich::DEFAULT_WORKERS;
use shelfsheet::pipeline::{self, RunOptions};
use shelfsheet::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;

    let report = pipeline::run(&RunOptions {
        config: cli.config,
        input: cli.input,
        output: cli.output,
        workers: cli.workers,
    })?;

    println!(
        "{} books across {} sheets written to {} ({} held by the library, {} not held, {} unknown)",
        report.records,
        report.sheets,
        report.output.display(),
        report.enrichment.owned,
        report.enrichment.not_owned,
        report.enrichment.unknown,
    );
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Enrich a book list with catalog data and school library holdings, then write it to Excel."
)]
struct Cli {
    /// YAML config with the catalog API key, library link and output name.
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Workbook listing the books: identifier, sheet, optional memo.
    #[arg(long, default_value = "list.xlsx")]
    input: PathBuf,

    /// Output path; overrides `outputFileName` from the config.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Maximum number of lookups running at once.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = parse_workers)]
    workers: usize,
}

fn parse_workers(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(workers) if workers >= 1 => Ok(workers),
        _ => Err(format!("'{value}' is not a positive integer")),
    }
}
