mod cli;
mod signals;

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_info, engine_warn, parse_level};
use ingest_engine::{EngineConfig, Orchestrator};
use tokio_util::sync::CancellationToken;

use cli::{Cli, LOG_LEVEL};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_source = load_env(cli.env_file.as_deref())?;
    let level = env::var(LOG_LEVEL).ok();
    engine_logging::initialize(&cli.log_options(level.as_deref()));
    if let Some(source) = env_source {
        engine_info!("Loaded settings from {}", source);
    }
    if let Some(raw) = level.as_deref().filter(|raw| parse_level(raw).is_none()) {
        engine_warn!("Unknown {} value {:?}, using info", LOG_LEVEL, raw);
    }

    let config = EngineConfig::from_lookup(|key| env::var(key).ok())
        .context("invalid configuration")?;
    let mut orchestrator =
        Orchestrator::from_config(config).context("failed to start the orchestrator")?;

    let cancel = CancellationToken::new();
    tokio::spawn(signals::cancel_on_shutdown(cancel.clone()));

    orchestrator.run(&cancel, cli.once).await;
    Ok(())
}

/// An explicit `--env-file` must exist; the implicit `.env` is optional.
fn load_env(explicit: Option<&Path>) -> Result<Option<String>> {
    match explicit {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
            Ok(Some(path.display().to_string()))
        }
        None => Ok(dotenvy::dotenv()
            .ok()
            .map(|path| path.display().to_string())),
    }
}
