use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::fetch::Fetcher;
use crate::{FailureKind, FetchError, FetchOutcome, FetchedContent, Layer};

/// Content produced by the first layer that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub layer: Layer,
    pub content: FetchedContent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Per-layer detail is logged, not carried.
    #[error("all methods failed")]
    AllLayersFailed { last_error: Option<FetchError> },
}

/// One position in the chain; `None` means the layer is disabled.
struct LayerSlot {
    layer: Layer,
    fetcher: Option<Arc<dyn Fetcher>>,
}

/// Ordered fallback chain: direct fetch, headless browser, remote render API.
pub struct ContentResolver {
    slots: Vec<LayerSlot>,
}

impl ContentResolver {
    /// Builds the chain in fixed layer order; pass `None` to disable a layer.
    pub fn new(
        direct: Option<Arc<dyn Fetcher>>,
        browser: Option<Arc<dyn Fetcher>>,
        render_api: Option<Arc<dyn Fetcher>>,
    ) -> Self {
        let slots = Layer::ALL
            .into_iter()
            .zip([direct, browser, render_api])
            .map(|(layer, fetcher)| LayerSlot { layer, fetcher })
            .collect();
        Self { slots }
    }

    pub fn enabled_layers(&self) -> Vec<Layer> {
        self.slots
            .iter()
            .filter(|slot| slot.fetcher.is_some())
            .map(|slot| slot.layer)
            .collect()
    }

    pub async fn resolve(&self, url: &str) -> Result<Resolved, ResolveError> {
        self.resolve_traced(url).await.1
    }

    /// Runs the chain and also returns one outcome per layer, including
    /// disabled layers (recorded as failed without being attempted).
    pub async fn resolve_traced(
        &self,
        url: &str,
    ) -> (Vec<FetchOutcome>, Result<Resolved, ResolveError>) {
        let mut trace = Vec::with_capacity(self.slots.len());
        let mut last_error = None;

        for slot in &self.slots {
            let Some(fetcher) = slot.fetcher.as_ref() else {
                engine_debug!("Layer {} disabled, skipping for {}", slot.layer, url);
                trace.push(FetchOutcome {
                    layer: slot.layer,
                    result: Err(FetchError::new(
                        FailureKind::Disabled,
                        "disabled by configuration",
                    )),
                });
                continue;
            };

            match fetcher.fetch(url).await {
                Ok(content) => {
                    engine_info!(
                        "Resolved {} via {} layer ({} bytes)",
                        url,
                        slot.layer,
                        content.bytes.len()
                    );
                    trace.push(FetchOutcome {
                        layer: slot.layer,
                        result: Ok(content.clone()),
                    });
                    return (
                        trace,
                        Ok(Resolved {
                            layer: slot.layer,
                            content,
                        }),
                    );
                }
                Err(err) => {
                    engine_warn!("Layer {} failed for {}: {}", slot.layer, url, err);
                    trace.push(FetchOutcome {
                        layer: slot.layer,
                        result: Err(err.clone()),
                    });
                    last_error = Some(err);
                }
            }
        }

        (trace, Err(ResolveError::AllLayersFailed { last_error }))
    }
}
