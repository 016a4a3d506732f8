use std::path::{Path, PathBuf};

use chrono::Datelike;
use tracing::{debug, info, instrument};

use crate::catalog::{AladinCatalog, CatalogLookup};
use crate::config::Settings;
use crate::enrich::{EnrichmentSummary, Enricher};
use crate::error::{Result, ToolError};
use crate::io::{excel_read, excel_write};
use crate::layout::{LayoutOptions, build_layout};
use crate::model::BookRecord;
use crate::ownership::{OwnershipLookup, Read365Library};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: PathBuf,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub workers: usize,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: usize,
    pub sheets: usize,
    pub output: PathBuf,
    pub enrichment: EnrichmentSummary,
}

/// Loads settings and the book list, enriches every book over HTTP and
/// writes the workbook. Configuration and input problems abort before any
/// request is sent.
#[instrument(
    level = "info",
    skip_all,
    fields(config = %options.config.display(), input = %options.input.display())
)]
pub fn run(options: &RunOptions) -> Result<RunReport> {
    let settings = Settings::load(&options.config)?;
    let mut records = load_records(&options.input)?;
    let output = options.output.clone().unwrap_or_else(|| settings.output.clone());

    let agent = ureq::Agent::new_with_defaults();
    let catalog = AladinCatalog::new(agent.clone(), settings.catalog_api_key.clone());
    let library = Read365Library::new(agent, settings.library.clone());

    let enrichment = enrich_records(catalog, library, &mut records, options.workers)?;

    let layout_options = LayoutOptions::new(settings.library, chrono::Local::now().year());
    let sheets = render(&records, &output, &layout_options)?;

    Ok(RunReport {
        records: records.len(),
        sheets,
        output,
        enrichment,
    })
}

/// Reads the book list, rejecting an empty one.
pub fn load_records(input: &Path) -> Result<Vec<BookRecord>> {
    let records = excel_read::read_book_list(input)?;
    if records.is_empty() {
        return Err(ToolError::NoRecords);
    }
    Ok(records)
}

/// Runs the lookups on a dedicated runtime whose blocking pool holds
/// exactly `workers` threads. Fails when no catalog lookup succeeded; the
/// records keep whatever the lookups filled in.
pub fn enrich_records<C, O>(
    catalog: C,
    library: O,
    records: &mut [BookRecord],
    workers: usize,
) -> Result<EnrichmentSummary>
where
    C: CatalogLookup + 'static,
    O: OwnershipLookup + 'static,
{
    let workers = workers.max(1);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(workers)
        .enable_all()
        .build()
        .map_err(|err| ToolError::Runtime(err.to_string()))?;

    let enricher = Enricher::new(catalog, library, workers);
    let summary = runtime.block_on(enricher.enrich(records));
    if summary.catalog_found == 0 {
        return Err(ToolError::NothingFound(records.len()));
    }
    Ok(summary)
}

/// Lays out the records and writes the workbook. Returns the sheet count.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn render(records: &[BookRecord], output: &Path, options: &LayoutOptions) -> Result<usize> {
    let sheets = build_layout(records, options);
    debug!(sheet_count = sheets.len(), "layout computed");
    excel_write::write_workbook(output, &sheets, options.font_size)?;
    info!(records = records.len(), sheet_count = sheets.len(), "workbook saved");
    Ok(sheets.len())
}
