use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::WorkItem;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Ephemeral per-cycle record of one work item moving through extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub item: WorkItem,
    pub status: JobStatus,
    pub retries: u32,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set once the extracted text has been written.
    pub output_path: Option<PathBuf>,
}

impl Job {
    pub fn new(id: JobId, item: WorkItem) -> Self {
        Self {
            id,
            item,
            status: JobStatus::Pending,
            retries: 0,
            error: None,
            started_at: None,
            finished_at: None,
            output_path: None,
        }
    }

    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    /// Records a failed attempt; the job stays in `Processing`.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retries += 1;
        self.error = Some(error.into());
    }

    pub fn complete(&mut self, output_path: PathBuf) {
        self.status = JobStatus::Completed;
        self.output_path = Some(output_path);
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = JobStatus::Failed;
        self.finished_at = Some(Utc::now());
    }
}

/// One pending job per item, ids assigned in item order starting at 1.
pub fn build_jobs(items: Vec<WorkItem>) -> Vec<Job> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| Job::new(index as JobId + 1, item))
        .collect()
}
