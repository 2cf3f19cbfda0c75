//! Ingest core: work items, jobs, the dedup ledger model and naming rules.
//!
//! Everything here is pure; IO lives in `ingest_engine`.
mod item;
mod job;
mod ledger;
mod naming;
mod url_list;

pub use item::{Fingerprint, SourceKind, WorkItem};
pub use job::{build_jobs, Job, JobId, JobStatus};
pub use ledger::{Ledger, LedgerEntry, LEDGER_VERSION};
pub use naming::{
    derive_fetch_filename, file_output_path, url_output_path, NamingOptions, CONTENT_EXTENSION,
    OUTPUT_EXTENSION, URL_OUTPUT_DIR,
};
pub use url_list::{is_http_url, is_url_list, parse_url_list, ParsedUrlList, RejectedLine, UrlEntry};
