use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ingest_engine::{
    ContentResolver, FailureKind, FetchError, FetchedContent, Fetcher, Layer, ResolveError,
};
use pretty_assertions::assert_eq;

struct ScriptedFetcher {
    layer: Layer,
    outcome: Result<&'static str, FailureKind>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn ok(layer: Layer, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            layer,
            outcome: Ok(body),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(layer: Layer, kind: FailureKind) -> Arc<Self> {
        Arc::new(Self {
            layer,
            outcome: Err(kind),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    fn layer(&self) -> Layer {
        self.layer
    }

    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(body) => Ok(FetchedContent {
                bytes: body.as_bytes().to_vec(),
                content_type: Some("text/html".to_string()),
                final_url: url.to_string(),
            }),
            Err(kind) => Err(FetchError::new(kind.clone(), format!("{} failed", self.layer))),
        }
    }
}

fn slot(fetcher: &Arc<ScriptedFetcher>) -> Option<Arc<dyn Fetcher>> {
    Some(fetcher.clone() as Arc<dyn Fetcher>)
}

#[tokio::test]
async fn falls_back_to_browser_and_never_reaches_render_api() {
    let direct = ScriptedFetcher::failing(Layer::Direct, FailureKind::NeedsRendering);
    let browser = ScriptedFetcher::ok(Layer::Browser, "<html>rendered</html>");
    let render_api = ScriptedFetcher::ok(Layer::RenderApi, "<html>remote</html>");
    let resolver = ContentResolver::new(slot(&direct), slot(&browser), slot(&render_api));

    let resolved = resolver.resolve("https://spa.example/").await.expect("resolved");

    assert_eq!(resolved.layer, Layer::Browser);
    assert_eq!(resolved.content.bytes, b"<html>rendered</html>".to_vec());
    assert_eq!(direct.calls(), 1);
    assert_eq!(browser.calls(), 1);
    assert_eq!(render_api.calls(), 0);
}

#[tokio::test]
async fn disabled_layers_are_recorded_but_not_attempted() {
    let direct = ScriptedFetcher::failing(Layer::Direct, FailureKind::HttpStatus(503));
    let render_api = ScriptedFetcher::ok(Layer::RenderApi, "<html>remote</html>");
    let resolver = ContentResolver::new(slot(&direct), None, slot(&render_api));

    assert_eq!(resolver.enabled_layers(), vec![Layer::Direct, Layer::RenderApi]);

    let (trace, result) = resolver.resolve_traced("https://spa.example/").await;
    let layers: Vec<(Layer, bool)> = trace.iter().map(|o| (o.layer, o.succeeded())).collect();
    assert_eq!(
        layers,
        vec![
            (Layer::Direct, false),
            (Layer::Browser, false),
            (Layer::RenderApi, true)
        ]
    );
    assert_eq!(
        trace[1].result.as_ref().map_err(|err| err.kind.clone()).err(),
        Some(FailureKind::Disabled)
    );
    assert_eq!(result.expect("resolved").layer, Layer::RenderApi);
}

#[tokio::test]
async fn exhausting_every_layer_reports_a_generic_failure() {
    let direct = ScriptedFetcher::failing(Layer::Direct, FailureKind::Timeout);
    let browser = ScriptedFetcher::failing(Layer::Browser, FailureKind::Launch);
    let resolver = ContentResolver::new(slot(&direct), slot(&browser), None);

    let err = resolver
        .resolve("https://down.example/")
        .await
        .expect_err("nothing succeeds");

    assert_eq!(err.to_string(), "all methods failed");
    let ResolveError::AllLayersFailed { last_error } = err;
    assert_eq!(last_error.map(|e| e.kind), Some(FailureKind::Launch));
}
