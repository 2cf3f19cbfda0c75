use std::path::{Path, PathBuf};
use std::process::Stdio;

use engine_logging::engine_debug;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub program: PathBuf,
    /// Passed to the service only when the file exists at call time.
    pub config_file: Option<PathBuf>,
    pub ocr: bool,
    pub force_ocr: bool,
    pub quality: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("kreuzberg"),
            config_file: Some(PathBuf::from("kreuzberg.toml")),
            ocr: true,
            force_ocr: false,
            quality: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("failed to start extractor {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("extractor timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Contract to the external conversion service.
///
/// Implementations must be cancel-safe: the scheduler drops the future when
/// an attempt times out.
#[async_trait::async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn extract(&self, input: &Path) -> Result<String, GatewayError>;
}

/// Runs the conversion service as a child process per input.
#[derive(Debug, Clone)]
pub struct CommandGateway {
    options: ExtractOptions,
}

impl CommandGateway {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn command_args(&self, input: &Path) -> Vec<String> {
        let mut args = vec![
            "extract".to_string(),
            input.display().to_string(),
            "--output-format".to_string(),
            "text".to_string(),
        ];
        if let Some(config) = self.options.config_file.as_ref().filter(|p| p.is_file()) {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        for (flag, value) in [
            ("--ocr", self.options.ocr),
            ("--force-ocr", self.options.force_ocr),
            ("--quality", self.options.quality),
        ] {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
        args
    }
}

#[async_trait::async_trait]
impl ExtractionGateway for CommandGateway {
    async fn extract(&self, input: &Path) -> Result<String, GatewayError> {
        let input = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
        let args = self.command_args(&input);
        engine_debug!("Running {:?} {:?}", self.options.program, args);

        let output = Command::new(&self.options.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| GatewayError::Spawn {
                program: self.options.program.display().to_string(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(GatewayError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
