//! Ingest engine: discovery, URL resolution, extraction and the cycle loop.
mod browser;
mod config;
mod decode;
mod discovery;
mod fetch;
mod fingerprint;
mod gateway;
mod ledger_store;
mod orchestrator;
mod persist;
mod quarantine;
mod render_api;
mod render_check;
mod resolver;
mod scheduler;
mod types;

pub use browser::{BrowserFetcher, BrowserSession, BrowserSettings};
pub use config::{ConfigError, EngineConfig};
pub use decode::decode_body;
pub use discovery::{DiscoveredFile, Discovery, Inputs};
pub use fetch::{
    DirectFetchSettings, DirectFetcher, Fetcher, DEFAULT_MAX_BYTES, DEFAULT_USER_AGENT,
};
pub use fingerprint::{fingerprint_bytes, fingerprint_file, fingerprint_url};
pub use gateway::{CommandGateway, ExtractOptions, ExtractionGateway, GatewayError};
pub use ledger_store::LedgerStore;
pub use orchestrator::{url_list_key, CycleError, CycleReport, Orchestrator, SetupError};
pub use persist::{ensure_dir, write_atomic, write_json_atomic, PersistError};
pub use quarantine::{Quarantine, QuarantineError, QuarantineRecord};
pub use render_api::{RenderApiFetcher, RenderApiSettings};
pub use render_check::{detect_rendering_requirement, RenderCheck, RenderReason};
pub use resolver::{ContentResolver, ResolveError, Resolved};
pub use scheduler::{JobScheduler, RetryPolicy};
pub use types::{FailureKind, FetchError, FetchOutcome, FetchedContent, Layer};

/// Environment keys read by [`EngineConfig::from_lookup`].
pub mod keys {
    pub use crate::config::{
        BROWSER_ENABLED, BROWSER_PATH, BROWSER_SETTLE_MS, BROWSER_TIMEOUT_SECS, CONCURRENCY,
        DIRECT_TIMEOUT_SECS, ERROR_DIR, EXTRACT_CONFIG, EXTRACT_PROGRAM, EXTRACT_TIMEOUT_SECS,
        FETCH_DIR, FORCE_OCR, INPUT_DIR, LEDGER_PATH, MAX_RETRIES, OCR, OUTPUT_DIR,
        PRESERVE_STRUCTURE, QUALITY, RECURSIVE, RENDER_API_ENABLED, RENDER_API_TIMEOUT_SECS,
        RENDER_API_TOKEN, RENDER_API_URL, RETRY_DELAY_MS, TIMESTAMP_SUFFIX, URL_FETCH, USER_AGENT,
        WATCH_INTERVAL_SECS,
    };
}
