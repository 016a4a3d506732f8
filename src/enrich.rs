//! Fans catalog and library lookups out over a bounded worker pool.
//!
//! Each task owns copies of the identifiers it needs and hands its result
//! back keyed by record index. Results are applied once every task has
//! finished, so no record is ever shared between workers.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogLookup;
use crate::error::LookupError;
use crate::model::{BookRecord, CatalogEntry, Identifier, Ownership};
use crate::ownership::OwnershipLookup;

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 5;

/// Counts reported once the batch has settled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub catalog_found: usize,
    pub catalog_failed: usize,
    pub owned: usize,
    pub not_owned: usize,
    pub unknown: usize,
}

/// One unit of work on the pool.
#[derive(Debug, Clone)]
enum Job {
    Catalog { index: usize, query: Identifier },
    Ownership { index: usize, isbn13: String },
    /// Item id only: the ISBN needed by the library lookup comes from the
    /// catalog response, so both run in order within one task.
    CatalogThenOwnership { index: usize, item_id: u64 },
}

impl Job {
    fn index(&self) -> usize {
        match self {
            Job::Catalog { index, .. }
            | Job::Ownership { index, .. }
            | Job::CatalogThenOwnership { index, .. } => *index,
        }
    }

    fn runs_catalog(&self) -> bool {
        !matches!(self, Job::Ownership { .. })
    }

    fn runs_ownership(&self) -> bool {
        !matches!(self, Job::Catalog { .. })
    }
}

#[derive(Debug)]
struct JobOutcome {
    index: usize,
    catalog: Option<Result<CatalogEntry, LookupError>>,
    ownership: Option<Ownership>,
}

/// Drives both lookups for every record to completion.
pub struct Enricher<C, O> {
    catalog: Arc<C>,
    ownership: Arc<O>,
    workers: usize,
}

impl<C, O> Enricher<C, O>
where
    C: CatalogLookup + 'static,
    O: OwnershipLookup + 'static,
{
    /// Creates an orchestrator running at most `workers` tasks at once.
    pub fn new(catalog: C, ownership: O, workers: usize) -> Self {
        Self {
            catalog: Arc::new(catalog),
            ownership: Arc::new(ownership),
            workers: workers.max(1),
        }
    }

    /// Runs every lookup and applies the results. Individual failures are
    /// logged and leave the affected fields at their defaults.
    #[instrument(level = "info", skip_all, fields(records = records.len(), workers = self.workers))]
    pub async fn enrich(&self, records: &mut [BookRecord]) -> EnrichmentSummary {
        let jobs = plan_jobs(records);
        debug!(jobs = jobs.len(), "lookup jobs planned");

        let outcomes: Vec<JobOutcome> = stream::iter(jobs)
            .map(|job| self.spawn(job))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut summary = EnrichmentSummary::default();
        for outcome in outcomes {
            let record = &mut records[outcome.index];
            if let Some(catalog) = outcome.catalog {
                match catalog {
                    Ok(entry) => {
                        record.apply_catalog(entry);
                        summary.catalog_found += 1;
                    }
                    Err(error) => {
                        warn!(book = %record.label(), %error, "catalog lookup failed");
                        summary.catalog_failed += 1;
                    }
                }
            }
            if let Some(ownership) = outcome.ownership {
                record.ownership = ownership;
            }
        }

        for record in records.iter() {
            match record.ownership {
                Ownership::Present { .. } => summary.owned += 1,
                Ownership::Absent => summary.not_owned += 1,
                Ownership::Unknown => summary.unknown += 1,
            }
        }

        info!(?summary, "enrichment finished");
        summary
    }

    async fn spawn(&self, job: Job) -> JobOutcome {
        let index = job.index();
        let runs_catalog = job.runs_catalog();
        let runs_ownership = job.runs_ownership();
        let catalog = Arc::clone(&self.catalog);
        let ownership = Arc::clone(&self.ownership);

        match tokio::task::spawn_blocking(move || run_job(job, &*catalog, &*ownership)).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(index, %error, "lookup worker did not complete");
                JobOutcome {
                    index,
                    catalog: runs_catalog.then(|| Err(LookupError::Worker(error.to_string()))),
                    ownership: runs_ownership.then_some(Ownership::Unknown),
                }
            }
        }
    }
}

fn plan_jobs(records: &[BookRecord]) -> Vec<Job> {
    let mut jobs = Vec::with_capacity(records.len() * 2);
    for (index, record) in records.iter().enumerate() {
        match (record.item_id, record.isbn13()) {
            (Some(item_id), None) => jobs.push(Job::CatalogThenOwnership { index, item_id }),
            (item_id, Some(isbn13)) => {
                let query = match item_id {
                    Some(id) => Identifier::ItemId(id),
                    None => Identifier::Isbn13(isbn13.to_string()),
                };
                jobs.push(Job::Catalog { index, query });
                jobs.push(Job::Ownership {
                    index,
                    isbn13: isbn13.to_string(),
                });
            }
            (None, None) => {
                warn!(index, "record has no identifier, skipping lookups");
            }
        }
    }
    jobs
}

fn run_job<C, O>(job: Job, catalog: &C, ownership: &O) -> JobOutcome
where
    C: CatalogLookup + ?Sized,
    O: OwnershipLookup + ?Sized,
{
    match job {
        Job::Catalog { index, query } => JobOutcome {
            index,
            catalog: Some(catalog.lookup(&query)),
            ownership: None,
        },
        Job::Ownership { index, isbn13 } => JobOutcome {
            index,
            catalog: None,
            ownership: Some(ownership.lookup(&isbn13)),
        },
        Job::CatalogThenOwnership { index, item_id } => {
            let result = catalog.lookup(&Identifier::ItemId(item_id));
            let status = match &result {
                Ok(entry) if !entry.isbn13.is_empty() => ownership.lookup(&entry.isbn13),
                Ok(_) => {
                    warn!(item_id, "catalog entry has no ISBN-13, library lookup skipped");
                    Ownership::Unknown
                }
                Err(_) => Ownership::Unknown,
            };
            JobOutcome {
                index,
                catalog: Some(result),
                ownership: Some(status),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct FakeCatalog {
        entries: HashMap<String, CatalogEntry>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeCatalog {
        fn with(mut self, key: &str, entry: CatalogEntry) -> Self {
            self.entries.insert(key.to_string(), entry);
            self
        }
    }

    impl CatalogLookup for FakeCatalog {
        fn lookup(&self, query: &Identifier) -> Result<CatalogEntry, LookupError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);

            let key = match query {
                Identifier::ItemId(id) => id.to_string(),
                Identifier::Isbn13(isbn) => isbn.clone(),
            };
            self.entries.get(&key).cloned().ok_or(LookupError::NotFound)
        }
    }

    #[derive(Default)]
    struct FakeLibrary {
        holdings: HashMap<String, Ownership>,
        calls: Mutex<Vec<String>>,
    }

    impl OwnershipLookup for FakeLibrary {
        fn lookup(&self, isbn13: &str) -> Ownership {
            self.calls.lock().expect("calls lock").push(isbn13.to_string());
            self.holdings.get(isbn13).cloned().unwrap_or(Ownership::Absent)
        }
    }

    fn entry(isbn13: &str, item_id: u64, title: &str) -> CatalogEntry {
        CatalogEntry {
            item_id: Some(item_id),
            isbn13: isbn13.to_string(),
            title: title.to_string(),
            standard_price: 12000,
            ..CatalogEntry::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn item_id_only_record_gets_isbn_before_library_lookup() {
        let catalog = FakeCatalog::default().with("555", entry("9788936434120", 555, "b"));
        let mut holdings = HashMap::new();
        holdings.insert(
            "9788936434120".to_string(),
            Ownership::Present {
                book_key: Some("1".into()),
                species_key: Some("2".into()),
            },
        );
        let library = FakeLibrary {
            holdings,
            ..FakeLibrary::default()
        };
        let enricher = Enricher::new(catalog, library, 3);
        let mut records = vec![BookRecord::new(Identifier::ItemId(555), "S", "", 0)];

        let summary = enricher.enrich(&mut records).await;

        assert_eq!(records[0].isbn13(), Some("9788936434120"));
        assert_eq!(records[0].ownership.reference_keys(), Some(("1", "2")));
        assert_eq!(summary.owned, 1);
        assert_eq!(
            *enricher.ownership.calls.lock().expect("calls lock"),
            vec!["9788936434120".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_catalog_lookup_keeps_defaults_and_identity() {
        let enricher = Enricher::new(FakeCatalog::default(), FakeLibrary::default(), 2);
        let mut records = vec![
            BookRecord::new(Identifier::Isbn13("9791190123456".into()), "S", "memo", 0),
            BookRecord::new(Identifier::ItemId(77), "S", "", 1),
        ];

        let summary = enricher.enrich(&mut records).await;

        let isbn_record = &records[0];
        assert_eq!(isbn_record.isbn13(), Some("9791190123456"));
        assert!(isbn_record.title.is_empty());
        assert!(isbn_record.author.is_empty());
        assert_eq!(isbn_record.standard_price, 0);
        assert_eq!(isbn_record.rating_count, 0);
        assert_eq!(isbn_record.memo, "memo");
        // The library lookup still runs for a known ISBN.
        assert_eq!(isbn_record.ownership, Ownership::Absent);

        let item_record = &records[1];
        assert_eq!(item_record.item_id, Some(77));
        assert_eq!(item_record.isbn13(), None);
        assert_eq!(item_record.ownership, Ownership::Unknown);

        assert_eq!(summary.catalog_failed, 2);
        assert_eq!(summary.unknown, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrency_never_exceeds_worker_count() {
        let mut catalog = FakeCatalog::default();
        let mut records = Vec::new();
        for n in 0..12u64 {
            let isbn = format!("979119012{n:04}");
            catalog = catalog.with(&isbn, entry(&isbn, n, "t"));
            records.push(BookRecord::new(Identifier::Isbn13(isbn), "S", "", n as usize));
        }
        let enricher = Enricher::new(catalog, FakeLibrary::default(), 3);

        let summary = enricher.enrich(&mut records).await;

        assert_eq!(summary.catalog_found, 12);
        assert!(enricher.catalog.peak.load(Ordering::SeqCst) <= 3);
        for (order, record) in records.iter().enumerate() {
            assert_eq!(record.display_order(), order);
            assert_eq!(record.item_id, Some(order as u64));
        }
    }

    #[test]
    fn plan_splits_known_isbn_into_two_jobs() {
        let records = vec![
            BookRecord::new(Identifier::Isbn13("9791190123456".into()), "S", "", 0),
            BookRecord::new(Identifier::ItemId(9), "S", "", 1),
        ];
        let jobs = plan_jobs(&records);
        assert_eq!(jobs.len(), 3);
        assert!(matches!(jobs[0], Job::Catalog { index: 0, .. }));
        assert!(matches!(jobs[1], Job::Ownership { index: 0, .. }));
        assert!(matches!(
            jobs[2],
            Job::CatalogThenOwnership {
                index: 1,
                item_id: 9
            }
        ));
    }
}
