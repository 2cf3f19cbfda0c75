use std::path::PathBuf;
use std::time::Duration;

use engine_logging::engine_warn;
use ingest_core::NamingOptions;
use thiserror::Error;

use crate::browser::BrowserSettings;
use crate::fetch::{DirectFetchSettings, DEFAULT_MAX_BYTES};
use crate::gateway::ExtractOptions;
use crate::render_api::RenderApiSettings;
use crate::scheduler::RetryPolicy;

pub const INPUT_DIR: &str = "INGEST_INPUT_DIR";
pub const OUTPUT_DIR: &str = "INGEST_OUTPUT_DIR";
pub const ERROR_DIR: &str = "INGEST_ERROR_DIR";
pub const FETCH_DIR: &str = "INGEST_FETCH_DIR";
pub const LEDGER_PATH: &str = "INGEST_LEDGER_PATH";
pub const WATCH_INTERVAL_SECS: &str = "INGEST_WATCH_INTERVAL_SECS";
pub const CONCURRENCY: &str = "INGEST_CONCURRENCY";
pub const RECURSIVE: &str = "INGEST_RECURSIVE";
pub const MAX_RETRIES: &str = "INGEST_MAX_RETRIES";
pub const RETRY_DELAY_MS: &str = "INGEST_RETRY_DELAY_MS";
pub const EXTRACT_TIMEOUT_SECS: &str = "INGEST_EXTRACT_TIMEOUT_SECS";
pub const EXTRACT_PROGRAM: &str = "INGEST_EXTRACT_PROGRAM";
pub const EXTRACT_CONFIG: &str = "INGEST_EXTRACT_CONFIG";
pub const OCR: &str = "INGEST_OCR";
pub const FORCE_OCR: &str = "INGEST_FORCE_OCR";
pub const QUALITY: &str = "INGEST_QUALITY";
pub const TIMESTAMP_SUFFIX: &str = "INGEST_TIMESTAMP_SUFFIX";
pub const PRESERVE_STRUCTURE: &str = "INGEST_PRESERVE_STRUCTURE";
pub const URL_FETCH: &str = "INGEST_URL_FETCH";
pub const DIRECT_TIMEOUT_SECS: &str = "INGEST_DIRECT_TIMEOUT_SECS";
pub const USER_AGENT: &str = "INGEST_USER_AGENT";
pub const BROWSER_ENABLED: &str = "INGEST_BROWSER_ENABLED";
pub const BROWSER_PATH: &str = "INGEST_BROWSER_PATH";
pub const BROWSER_TIMEOUT_SECS: &str = "INGEST_BROWSER_TIMEOUT_SECS";
pub const BROWSER_SETTLE_MS: &str = "INGEST_BROWSER_SETTLE_MS";
pub const RENDER_API_ENABLED: &str = "INGEST_RENDER_API_ENABLED";
pub const RENDER_API_URL: &str = "INGEST_RENDER_API_URL";
pub const RENDER_API_TOKEN: &str = "INGEST_RENDER_API_TOKEN";
pub const RENDER_API_TIMEOUT_SECS: &str = "INGEST_RENDER_API_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be at least 1 (got {value})")]
    BelowMinimum { key: &'static str, value: i64 },
    #[error("{key} must not be negative (got {value})")]
    Negative { key: &'static str, value: i64 },
}

/// Typed daemon configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub error_dir: PathBuf,
    /// Staging area for fetched URL content; must not be the input tree.
    pub fetch_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub watch_interval: Duration,
    pub concurrency: usize,
    pub recursive: bool,
    pub retry: RetryPolicy,
    pub extract: ExtractOptions,
    pub naming: NamingOptions,
    pub url_fetch: bool,
    pub direct: DirectFetchSettings,
    /// `None` disables the browser layer.
    pub browser: Option<BrowserSettings>,
    /// `None` disables the render API layer.
    pub render_api: Option<RenderApiSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./input"),
            output_dir: PathBuf::from("./output"),
            error_dir: PathBuf::from("./errors"),
            fetch_dir: PathBuf::from("./fetched"),
            ledger_path: PathBuf::from("./output/.ingest_ledger.json"),
            watch_interval: Duration::from_secs(30),
            concurrency: 3,
            recursive: true,
            retry: RetryPolicy::default(),
            extract: ExtractOptions::default(),
            naming: NamingOptions {
                timestamp_suffix: false,
                preserve_structure: true,
            },
            url_fetch: true,
            direct: DirectFetchSettings::default(),
            browser: None,
            render_api: None,
        }
    }
}

impl EngineConfig {
    /// Builds the configuration from `INGEST_*` keys.
    ///
    /// Missing or unparsable values fall back to their defaults. Only a watch
    /// interval or concurrency below 1 and a negative retry count are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let defaults = Self::default();

        let watch_secs = env.int(WATCH_INTERVAL_SECS, defaults.watch_interval.as_secs() as i64);
        if watch_secs < 1 {
            return Err(ConfigError::BelowMinimum {
                key: WATCH_INTERVAL_SECS,
                value: watch_secs,
            });
        }
        let concurrency = env.int(CONCURRENCY, defaults.concurrency as i64);
        if concurrency < 1 {
            return Err(ConfigError::BelowMinimum {
                key: CONCURRENCY,
                value: concurrency,
            });
        }
        let max_retries = env.int(MAX_RETRIES, defaults.retry.max_retries as i64);
        if max_retries < 0 {
            return Err(ConfigError::Negative {
                key: MAX_RETRIES,
                value: max_retries,
            });
        }

        let retry = RetryPolicy {
            max_retries: u32::try_from(max_retries).unwrap_or(u32::MAX),
            retry_delay: env.millis(RETRY_DELAY_MS, defaults.retry.retry_delay),
            attempt_timeout: env.secs(EXTRACT_TIMEOUT_SECS, defaults.retry.attempt_timeout),
        };

        let extract = ExtractOptions {
            program: env.path(EXTRACT_PROGRAM).unwrap_or(defaults.extract.program),
            config_file: env.path(EXTRACT_CONFIG).or(defaults.extract.config_file),
            ocr: env.flag(OCR, defaults.extract.ocr),
            force_ocr: env.flag(FORCE_OCR, defaults.extract.force_ocr),
            quality: env.flag(QUALITY, defaults.extract.quality),
        };

        let naming = NamingOptions {
            timestamp_suffix: env.flag(TIMESTAMP_SUFFIX, defaults.naming.timestamp_suffix),
            preserve_structure: env.flag(PRESERVE_STRUCTURE, defaults.naming.preserve_structure),
        };

        let direct = DirectFetchSettings {
            request_timeout: env.secs(DIRECT_TIMEOUT_SECS, defaults.direct.request_timeout),
            user_agent: env.text(USER_AGENT).unwrap_or(defaults.direct.user_agent),
            ..defaults.direct
        };

        let browser = if env.flag(BROWSER_ENABLED, false) {
            let base = BrowserSettings::default();
            Some(BrowserSettings {
                binary: env.path(BROWSER_PATH).unwrap_or(base.binary),
                navigation_timeout: env.secs(BROWSER_TIMEOUT_SECS, base.navigation_timeout),
                settle_delay: env.millis(BROWSER_SETTLE_MS, base.settle_delay),
                ..base
            })
        } else {
            None
        };

        let render_api = if env.flag(RENDER_API_ENABLED, false) {
            match env.text(RENDER_API_URL) {
                Some(endpoint) => Some(RenderApiSettings {
                    endpoint,
                    token: env.text(RENDER_API_TOKEN),
                    timeout: env.secs(RENDER_API_TIMEOUT_SECS, Duration::from_secs(60)),
                    settle_delay: env.millis(BROWSER_SETTLE_MS, Duration::from_millis(2000)),
                    max_bytes: DEFAULT_MAX_BYTES,
                }),
                None => {
                    engine_warn!(
                        "{} is set but {} is empty; render API layer disabled",
                        RENDER_API_ENABLED,
                        RENDER_API_URL
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            input_dir: env.path(INPUT_DIR).unwrap_or(defaults.input_dir),
            output_dir: env.path(OUTPUT_DIR).unwrap_or(defaults.output_dir),
            error_dir: env.path(ERROR_DIR).unwrap_or(defaults.error_dir),
            fetch_dir: env.path(FETCH_DIR).unwrap_or(defaults.fetch_dir),
            ledger_path: env.path(LEDGER_PATH).unwrap_or(defaults.ledger_path),
            watch_interval: Duration::from_secs(watch_secs as u64),
            concurrency: concurrency as usize,
            recursive: env.flag(RECURSIVE, defaults.recursive),
            retry,
            extract,
            naming,
            url_fetch: env.flag(URL_FETCH, defaults.url_fetch),
            direct,
            browser,
            render_api,
        })
    }

    /// Checks the invariants `from_lookup` enforces, for configs built in code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_interval < Duration::from_secs(1) {
            return Err(ConfigError::BelowMinimum {
                key: WATCH_INTERVAL_SECS,
                value: self.watch_interval.as_secs() as i64,
            });
        }
        if self.concurrency < 1 {
            return Err(ConfigError::BelowMinimum {
                key: CONCURRENCY,
                value: 0,
            });
        }
        Ok(())
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn text(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.text(key).map(PathBuf::from)
    }

    fn int(&self, key: &str, default: i64) -> i64 {
        match self.text(key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                engine_warn!("Ignoring non-numeric {}={:?}, using {}", key, raw, default);
                default
            }),
        }
    }

    /// Non-negative integer; negative values fall back to the default.
    fn unsigned(&self, key: &str, default: u64) -> u64 {
        let value = self.int(key, default as i64);
        u64::try_from(value).unwrap_or_else(|_| {
            engine_warn!("Ignoring negative {}={}, using {}", key, value, default);
            default
        })
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        Duration::from_secs(self.unsigned(key, default.as_secs()))
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        Duration::from_millis(self.unsigned(key, default.as_millis() as u64))
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.text(key) {
            None => default,
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                engine_warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                default
            }),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
