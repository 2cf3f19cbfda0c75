#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ingest_engine::{ExtractionGateway, GatewayError};

/// In-process stand-in for the conversion service.
///
/// Inputs whose file name is in `failing` always fail; the first
/// `transient_failures` calls fail regardless of input.
#[derive(Default)]
pub struct FakeGateway {
    pub delay: Duration,
    pub failing: HashSet<String>,
    pub transient_failures: usize,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn failing_first(mut self, calls: usize) -> Self {
        self.transient_failures = calls;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ExtractionGateway for FakeGateway {
    async fn extract(&self, input: &Path) -> Result<String, GatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.seen.lock().unwrap().push(name.clone());

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if call < self.transient_failures || self.failing.contains(&name) {
            return Err(GatewayError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("cannot convert {name}"),
            });
        }
        let body = std::fs::read_to_string(input).unwrap_or_default();
        Ok(format!("extracted: {body}"))
    }
}
