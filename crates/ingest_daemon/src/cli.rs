use std::path::PathBuf;

use clap::Parser;
use engine_logging::{parse_level, LogOptions};

pub const LOG_LEVEL: &str = "INGEST_LOG_LEVEL";

#[derive(Debug, Parser)]
#[command(name = "ingest_daemon")]
#[command(about = "Watch a folder and turn documents and URL lists into plain text")]
#[command(version)]
pub struct Cli {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Load INGEST_* settings from this file before reading the environment
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Also write log output to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Unknown level names fall back to the logger's default.
    pub fn log_options(&self, level: Option<&str>) -> LogOptions {
        LogOptions {
            level: level.and_then(parse_level),
            file: self.log_file.clone(),
        }
    }
}
