use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use futures_util::future::join_all;
use ingest_core::{Job, JobStatus, Ledger, WorkItem};
use tokio_util::sync::CancellationToken;

use crate::gateway::{ExtractionGateway, GatewayError};
use crate::ledger_store::LedgerStore;
use crate::persist::write_atomic;
use crate::quarantine::Quarantine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per job; zero is treated as one.
    pub max_retries: u32,
    /// Fixed pause between attempts; there is no exponential backoff.
    pub retry_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(300),
        }
    }
}

/// Drives jobs through the extraction gateway in concurrency-bounded batches.
pub struct JobScheduler {
    gateway: Arc<dyn ExtractionGateway>,
    quarantine: Quarantine,
    policy: RetryPolicy,
}

impl JobScheduler {
    pub fn new(
        gateway: Arc<dyn ExtractionGateway>,
        quarantine: Quarantine,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            quarantine,
            policy,
        }
    }

    pub fn build_jobs(&self, items: Vec<WorkItem>) -> Vec<Job> {
        ingest_core::build_jobs(items)
    }

    /// Runs `jobs` in sequential batches of at most `limit`.
    ///
    /// Every job of a batch reaches a terminal status before the next batch
    /// starts. Ledger updates for completed jobs are applied here, on the
    /// caller's task, after each batch returns, and the ledger is saved.
    /// Once `cancel` fires no further batch starts; unstarted jobs come back
    /// still `Pending`.
    pub async fn run_batches(
        &self,
        jobs: Vec<Job>,
        limit: usize,
        ledger: &mut Ledger,
        store: &LedgerStore,
        cancel: &CancellationToken,
    ) -> Vec<Job> {
        let limit = limit.max(1);
        let total = jobs.len();
        let mut finished = Vec::with_capacity(total);
        let mut remaining = jobs.into_iter();
        let mut batch_no = 0usize;

        loop {
            let batch: Vec<Job> = remaining.by_ref().take(limit).collect();
            if batch.is_empty() {
                break;
            }
            if cancel.is_cancelled() {
                let left = batch.len() + remaining.len();
                engine_info!("Shutdown requested, {} of {} jobs not started", left, total);
                finished.extend(batch);
                finished.extend(remaining);
                break;
            }

            batch_no += 1;
            engine_info!("Batch {} starting with {} jobs", batch_no, batch.len());
            let results = join_all(batch.into_iter().map(|job| self.run_job(job))).await;

            let recorded = record_completed(ledger, &results);
            store.save_or_warn(ledger);
            engine_info!(
                "Batch {} finished: {} completed, {} failed",
                batch_no,
                recorded,
                results.len() - recorded
            );
            finished.extend(results);
        }

        finished
    }

    /// Attempts extraction up to the retry limit with a fixed delay between
    /// attempts. A job that exhausts its attempts is quarantined.
    pub async fn run_job(&self, mut job: Job) -> Job {
        job.start();
        let attempts = self.policy.max_retries.max(1);

        for attempt in 1..=attempts {
            match self.attempt(&job.item).await {
                Ok(output_path) => {
                    engine_info!(
                        "Job {} extracted {:?} -> {:?} (attempt {}/{})",
                        job.id,
                        job.item.display_path,
                        output_path,
                        attempt,
                        attempts
                    );
                    job.complete(output_path);
                    return job;
                }
                Err(message) => {
                    engine_warn!(
                        "Job {} attempt {}/{} failed for {:?}: {}",
                        job.id,
                        attempt,
                        attempts,
                        job.item.display_path,
                        message
                    );
                    job.record_failure(message);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        job.fail();
        let error = job.error.clone().unwrap_or_default();
        match self.quarantine.quarantine(&job.item, &error).await {
            Ok(record) => engine_warn!(
                "Job {} failed permanently, input copied to {:?}",
                job.id,
                record.copy_path
            ),
            Err(err) => engine_error!(
                "Job {} failed and could not be quarantined: {}",
                job.id,
                err
            ),
        }
        job
    }

    async fn attempt(&self, item: &WorkItem) -> Result<PathBuf, String> {
        let timeout = self.policy.attempt_timeout;
        let extraction = self.gateway.extract(&item.source_path);
        let text = match tokio::time::timeout(timeout, extraction).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(timeout)),
        }
        .map_err(|err| err.to_string())?;

        write_atomic(&item.output_path, text.as_bytes()).map_err(|err| err.to_string())?;
        Ok(item.output_path.clone())
    }
}

/// Applies ledger entries for completed jobs only; returns how many.
fn record_completed(ledger: &mut Ledger, jobs: &[Job]) -> usize {
    let mut recorded = 0;
    for job in jobs.iter().filter(|job| job.status == JobStatus::Completed) {
        let output = job
            .output_path
            .as_deref()
            .unwrap_or(job.item.output_path.as_path());
        ledger.mark_processed(
            job.item.key.clone(),
            job.item.fingerprint.clone(),
            output,
            job.retries,
        );
        recorded += 1;
    }
    recorded
}
