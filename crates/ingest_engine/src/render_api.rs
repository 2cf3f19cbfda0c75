use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::fetch::{map_reqwest_error, read_capped, Fetcher};
use crate::{FailureKind, FetchError, FetchedContent, Layer};

#[derive(Debug, Clone)]
pub struct RenderApiSettings {
    pub endpoint: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub settle_delay: Duration,
    pub max_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    wait_ms: u64,
    timeout_ms: u64,
}

/// Layer 3: asks a remote rendering service to render the page for us.
#[derive(Debug, Clone)]
pub struct RenderApiFetcher {
    settings: RenderApiSettings,
    client: reqwest::Client,
}

impl RenderApiFetcher {
    pub fn new(settings: RenderApiSettings) -> Result<Self, FetchError> {
        // The request itself may take as long as the remote render plus a margin.
        let client = reqwest::Client::builder()
            .timeout(settings.timeout + settings.settle_delay + Duration::from_secs(5))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl Fetcher for RenderApiFetcher {
    fn layer(&self) -> Layer {
        Layer::RenderApi
    }

    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        let body = serde_json::to_vec(&RenderRequest {
            url,
            wait_ms: self.settings.settle_delay.as_millis() as u64,
            timeout_ms: self.settings.timeout.as_millis() as u64,
        })
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut request = self
            .client
            .post(self.settings.endpoint.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = self.settings.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = read_capped(response, self.settings.max_bytes).await?;

        Ok(FetchedContent {
            bytes,
            content_type,
            final_url: url.to_string(),
        })
    }
}
