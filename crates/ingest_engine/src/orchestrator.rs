use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use ingest_core::{
    derive_fetch_filename, file_output_path, parse_url_list, url_output_path, Job, JobStatus,
    Ledger, WorkItem, URL_OUTPUT_DIR,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserFetcher;
use crate::config::{ConfigError, EngineConfig};
use crate::discovery::{DiscoveredFile, Discovery};
use crate::fetch::{DirectFetcher, Fetcher};
use crate::fingerprint::{fingerprint_file, fingerprint_url};
use crate::gateway::{CommandGateway, ExtractionGateway};
use crate::ledger_store::LedgerStore;
use crate::persist::{ensure_dir, write_atomic, PersistError};
use crate::quarantine::Quarantine;
use crate::render_api::RenderApiFetcher;
use crate::resolver::ContentResolver;
use crate::scheduler::JobScheduler;
use crate::FetchError;

const URL_LIST_KEY_PREFIX: &str = "urllist:";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot prepare {path}: {source}")]
    Dir { path: PathBuf, source: PersistError },
    #[error("cannot build render API client: {0}")]
    RenderApi(FetchError),
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to scan input directory {path}: {source}")]
    Discovery { path: PathBuf, source: io::Error },
}

/// Counts of one cycle, logged at its end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub url_lists_processed: usize,
    pub url_lists_unchanged: usize,
    pub urls_resolved: usize,
    pub urls_unresolved: usize,
    pub urls_unchanged: usize,
    pub files_unchanged: usize,
    pub completed: usize,
    pub failed: usize,
    /// Jobs left unstarted because shutdown was requested.
    pub pending: usize,
}

impl CycleReport {
    fn tally(&mut self, jobs: &[Job]) {
        for job in jobs {
            match job.status {
                JobStatus::Completed => self.completed += 1,
                JobStatus::Failed => self.failed += 1,
                JobStatus::Pending | JobStatus::Processing => self.pending += 1,
            }
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} pending, {} files unchanged, \
             {} URL lists processed ({} unchanged), {} URLs resolved, {} unresolved, {} unchanged",
            self.completed,
            self.failed,
            self.pending,
            self.files_unchanged,
            self.url_lists_processed,
            self.url_lists_unchanged,
            self.urls_resolved,
            self.urls_unresolved,
            self.urls_unchanged
        )
    }
}

/// Drives discovery, URL resolution and extraction cycles over the input tree.
pub struct Orchestrator {
    config: EngineConfig,
    discovery: Discovery,
    resolver: ContentResolver,
    scheduler: JobScheduler,
    store: LedgerStore,
    ledger: Ledger,
}

impl Orchestrator {
    /// Wires the production fetchers and the command-line extraction gateway.
    pub fn from_config(config: EngineConfig) -> Result<Self, SetupError> {
        let resolver = build_resolver(&config)?;
        let gateway = Arc::new(CommandGateway::new(config.extract.clone()));
        Self::with_components(config, resolver, gateway)
    }

    /// Validates the config, creates the working directories and loads the
    /// ledger.
    pub fn with_components(
        mut config: EngineConfig,
        resolver: ContentResolver,
        gateway: Arc<dyn ExtractionGateway>,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        for dir in [
            &config.input_dir,
            &config.output_dir,
            &config.error_dir,
            &config.fetch_dir,
        ] {
            ensure_dir(dir).map_err(|source| SetupError::Dir {
                path: dir.clone(),
                source,
            })?;
        }
        // Ledger keys for files are absolute paths.
        config.input_dir = absolute(&config.input_dir);

        let discovery = Discovery::new(config.input_dir.clone(), config.recursive)
            .exclude(absolute(&config.output_dir))
            .exclude(absolute(&config.error_dir))
            .exclude(absolute(&config.fetch_dir));
        let scheduler = JobScheduler::new(
            gateway,
            Quarantine::new(config.error_dir.clone()),
            config.retry.clone(),
        );
        let store = LedgerStore::new(config.ledger_path.clone());
        let ledger = store.load();

        engine_info!("Layers enabled: {:?}", resolver.enabled_layers());
        Ok(Self {
            config,
            discovery,
            resolver,
            scheduler,
            store,
            ledger,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs cycles every watch interval until `cancel` fires, or once.
    ///
    /// A failed cycle is logged and the loop carries on. The ledger is saved
    /// before returning.
    pub async fn run(&mut self, cancel: &CancellationToken, once: bool) {
        engine_info!(
            "Watching {:?} every {:?} (concurrency {})",
            self.config.input_dir,
            self.config.watch_interval,
            self.config.concurrency
        );

        loop {
            match self.run_cycle(cancel).await {
                Ok(report) => engine_info!("Cycle finished: {}", report),
                Err(err) => engine_error!("Cycle failed: {}", err),
            }
            if once || cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.watch_interval) => {}
            }
        }

        self.store.save_or_warn(&mut self.ledger);
        engine_info!("Orchestrator stopped");
    }

    /// One pass: URL lists first, then regular files, then a ledger save.
    pub async fn run_cycle(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleError> {
        let now = Utc::now();
        let mut report = CycleReport::default();

        let inputs = self
            .discovery
            .scan()
            .await
            .map_err(|source| CycleError::Discovery {
                path: self.discovery.root().to_path_buf(),
                source,
            })?;
        engine_debug!(
            "Discovered {} URL lists and {} files",
            inputs.url_lists.len(),
            inputs.documents.len()
        );

        if self.config.url_fetch {
            for list in &inputs.url_lists {
                if cancel.is_cancelled() {
                    break;
                }
                self.process_url_list(list, now, cancel, &mut report).await;
            }
        } else if !inputs.url_lists.is_empty() {
            engine_info!(
                "URL fetching disabled, ignoring {} URL lists",
                inputs.url_lists.len()
            );
        }

        if !cancel.is_cancelled() {
            let items = self.pending_files(inputs.documents, now, &mut report).await;
            let jobs = self.scheduler.build_jobs(items);
            let finished = self
                .scheduler
                .run_batches(
                    jobs,
                    self.config.concurrency,
                    &mut self.ledger,
                    &self.store,
                    cancel,
                )
                .await;
            report.tally(&finished);
        }

        self.store.save_or_warn(&mut self.ledger);
        Ok(report)
    }

    async fn pending_files(
        &self,
        documents: Vec<DiscoveredFile>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Vec<WorkItem> {
        let mut items = Vec::new();
        for doc in documents {
            let fingerprint = match fingerprint_file(&doc.path).await {
                Ok(fingerprint) => fingerprint,
                Err(err) => {
                    engine_warn!("Cannot fingerprint {:?}: {}", doc.path, err);
                    continue;
                }
            };
            let key = doc.path.to_string_lossy();
            if self.ledger.is_processed(&key, &fingerprint) {
                report.files_unchanged += 1;
                continue;
            }
            let output =
                file_output_path(&self.config.output_dir, &doc.relative, self.config.naming, now);
            items.push(WorkItem::file(doc.path, doc.relative, fingerprint, output));
        }
        items
    }

    /// Resolves and extracts every unseen URL of one list. The list itself is
    /// marked processed only when each of its URLs is done.
    async fn process_url_list(
        &mut self,
        list: &DiscoveredFile,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) {
        let list_fingerprint = match fingerprint_file(&list.path).await {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                engine_warn!("Cannot fingerprint URL list {:?}: {}", list.path, err);
                return;
            }
        };
        let list_key = url_list_key(&list.path);
        if self.ledger.is_processed(&list_key, &list_fingerprint) {
            report.url_lists_unchanged += 1;
            return;
        }

        let text = match tokio::fs::read_to_string(&list.path).await {
            Ok(text) => text,
            Err(err) => {
                engine_warn!("Cannot read URL list {:?}: {}", list.path, err);
                return;
            }
        };
        let parsed = parse_url_list(&text);
        for rejected in &parsed.rejected {
            engine_warn!(
                "{:?} line {}: skipping malformed URL {:?}",
                list.relative,
                rejected.line_number,
                rejected.text
            );
        }
        engine_info!(
            "Processing URL list {:?} with {} URLs",
            list.relative,
            parsed.entries.len()
        );

        let mut every_url_done = true;
        // Outputs of completed items stay claimed across cycles.
        let mut claimed: HashSet<PathBuf> = self
            .ledger
            .files
            .values()
            .map(|entry| entry.output_path.clone())
            .collect();
        let mut items = Vec::new();
        for entry in &parsed.entries {
            if cancel.is_cancelled() {
                every_url_done = false;
                break;
            }
            let fingerprint = fingerprint_url(&entry.url);
            if self.ledger.is_processed(&entry.url, &fingerprint) {
                report.urls_unchanged += 1;
                continue;
            }

            let resolved = match self.resolver.resolve(&entry.url).await {
                Ok(resolved) => resolved,
                Err(err) => {
                    engine_warn!("Skipping {} this cycle: {}", entry.url, err);
                    report.urls_unresolved += 1;
                    every_url_done = false;
                    continue;
                }
            };

            let (name, output) = reserve_name(
                derive_fetch_filename(&entry.url, entry.filename.as_deref(), now),
                &mut claimed,
                |candidate| {
                    url_output_path(&self.config.output_dir, candidate, self.config.naming, now)
                },
            );
            let staged = self.config.fetch_dir.join(&name);
            if let Err(err) = write_atomic(&staged, &resolved.content.bytes) {
                engine_warn!("Cannot stage content of {} at {:?}: {}", entry.url, staged, err);
                every_url_done = false;
                continue;
            }
            report.urls_resolved += 1;

            items.push(WorkItem::url(
                &entry.url,
                staged,
                PathBuf::from(&name),
                fingerprint,
                output,
                entry.filename.clone(),
            ));
        }

        let jobs = self.scheduler.build_jobs(items);
        let finished = self
            .scheduler
            .run_batches(
                jobs,
                self.config.concurrency,
                &mut self.ledger,
                &self.store,
                cancel,
            )
            .await;
        report.tally(&finished);

        let all_completed = finished.iter().all(|job| job.status == JobStatus::Completed);
        if every_url_done && all_completed {
            let marker = self.config.output_dir.join(URL_OUTPUT_DIR);
            self.ledger
                .mark_processed(list_key, list_fingerprint, &marker, 0);
            self.store.save_or_warn(&mut self.ledger);
            report.url_lists_processed += 1;
        } else {
            engine_info!(
                "URL list {:?} has unfinished URLs, it will be revisited next cycle",
                list.relative
            );
        }
    }
}

fn build_resolver(config: &EngineConfig) -> Result<ContentResolver, SetupError> {
    let direct: Arc<dyn Fetcher> = Arc::new(DirectFetcher::new(config.direct.clone()));
    let browser = config
        .browser
        .clone()
        .map(|settings| Arc::new(BrowserFetcher::new(settings)) as Arc<dyn Fetcher>);
    let render_api = match config.render_api.clone() {
        Some(settings) => {
            let fetcher = RenderApiFetcher::new(settings).map_err(SetupError::RenderApi)?;
            Some(Arc::new(fetcher) as Arc<dyn Fetcher>)
        }
        None => None,
    };
    Ok(ContentResolver::new(Some(direct), browser, render_api))
}

pub fn url_list_key(path: &Path) -> String {
    format!("{URL_LIST_KEY_PREFIX}{}", path.display())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Picks the first of `name`, `name_2`, `name_3`, ... whose output path is
/// not already claimed, and claims it.
fn reserve_name(
    name: String,
    claimed: &mut HashSet<PathBuf>,
    output_for: impl Fn(&str) -> PathBuf,
) -> (String, PathBuf) {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (name.clone(), String::new()),
    };
    let mut candidate = name;
    let mut n = 2;
    loop {
        let output = output_for(&candidate);
        if claimed.insert(output.clone()) {
            return (candidate, output);
        }
        candidate = format!("{stem}_{n}{ext}");
        n += 1;
    }
}
