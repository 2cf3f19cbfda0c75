use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::fetch::Fetcher;
use crate::{FailureKind, FetchError, FetchedContent, Layer};

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Chromium-family executable.
    pub binary: PathBuf,
    /// Arguments placed before the browser flags, for wrappers such as `xvfb-run`.
    pub prefix_args: Vec<String>,
    pub navigation_timeout: Duration,
    /// Extra virtual time granted for client-side rendering to finish.
    pub settle_delay: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("chromium"),
            prefix_args: Vec::new(),
            navigation_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_millis(2000),
        }
    }
}

/// Layer 2: renders the page in a headless browser and dumps the DOM.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    settings: BrowserSettings,
}

impl BrowserFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Fetcher for BrowserFetcher {
    fn layer(&self) -> Layer {
        Layer::Browser
    }

    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        url::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut session = BrowserSession::launch(&self.settings, url)?;
        let budget = self.settings.navigation_timeout + self.settings.settle_delay;
        let outcome = tokio::time::timeout(budget, session.dump_dom()).await;
        session.close().await;
        let dom = match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::new(
                    FailureKind::Timeout,
                    format!("browser did not finish within {budget:?}"),
                ))
            }
        };

        if dom.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::new(
                FailureKind::NeedsRendering,
                "browser returned an empty document",
            ));
        }

        Ok(FetchedContent {
            bytes: dom,
            content_type: Some("text/html; charset=utf-8".to_string()),
            final_url: url.to_string(),
        })
    }
}

/// A running headless browser with its own throwaway profile directory.
///
/// [`BrowserSession::close`] kills the process, waits for it to exit and then
/// removes the profile. A session dropped without `close` (a cancelled fetch)
/// does the same on a background task.
pub struct BrowserSession {
    running: Option<Running>,
}

struct Running {
    child: Child,
    profile: TempDir,
}

impl Running {
    async fn shut_down(mut self) {
        let _ = self.child.start_kill();
        if let Err(err) = self.child.wait().await {
            engine_warn!("Browser pid={:?} did not exit cleanly: {}", self.child.id(), err);
        }
        // The profile is removed only after the browser is gone.
        drop(self.profile);
    }
}

impl BrowserSession {
    pub fn launch(settings: &BrowserSettings, url: &str) -> Result<Self, FetchError> {
        let profile = tempfile::Builder::new()
            .prefix("ingest-browser-")
            .tempdir()
            .map_err(|err| FetchError::new(FailureKind::Launch, err.to_string()))?;

        let child = Command::new(&settings.binary)
            .args(&settings.prefix_args)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg(format!("--timeout={}", settings.navigation_timeout.as_millis()))
            .arg(format!("--virtual-time-budget={}", settings.settle_delay.as_millis()))
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                FetchError::new(
                    FailureKind::Launch,
                    format!("{}: {err}", settings.binary.display()),
                )
            })?;

        engine_debug!(
            "Launched browser pid={:?} profile={:?} url={}",
            child.id(),
            profile.path(),
            url
        );
        Ok(Self {
            running: Some(Running { child, profile }),
        })
    }

    pub fn profile_dir(&self) -> Option<PathBuf> {
        self.running
            .as_ref()
            .map(|running| running.profile.path().to_path_buf())
    }

    /// Kills the browser if it still runs and removes its profile.
    pub async fn close(mut self) {
        if let Some(running) = self.running.take() {
            running.shut_down().await;
        }
    }

    async fn dump_dom(&mut self) -> Result<Vec<u8>, FetchError> {
        let child = match self.running.as_mut() {
            Some(running) => &mut running.child,
            None => return Err(FetchError::new(FailureKind::Launch, "browser already closed")),
        };
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::new(FailureKind::Launch, "browser stdout unavailable"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::new(FailureKind::Launch, "browser stderr unavailable"))?;

        let mut dom = Vec::new();
        let mut diagnostics = Vec::new();
        let (out_read, _, status) = tokio::join!(
            stdout.read_to_end(&mut dom),
            stderr.read_to_end(&mut diagnostics),
            child.wait()
        );
        out_read.map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        let status = status.map_err(|err| FetchError::new(FailureKind::Launch, err.to_string()))?;
        check_status(status, &diagnostics)?;
        Ok(dom)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(running.shut_down());
            }
            Err(_) => {
                // No runtime left to reap the child; kill it and let `TempDir`
                // clean up as far as it can.
                let _ = running.child.start_kill();
            }
        }
    }
}

fn check_status(status: ExitStatus, diagnostics: &[u8]) -> Result<(), FetchError> {
    if status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(diagnostics);
    Err(FetchError::new(
        FailureKind::Network,
        format!("browser exited with {status}: {}", stderr.trim()),
    ))
}
