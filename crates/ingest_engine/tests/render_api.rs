use std::time::Duration;

use ingest_engine::{FailureKind, Fetcher, RenderApiFetcher, RenderApiSettings};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, token: Option<&str>) -> RenderApiSettings {
    RenderApiSettings {
        endpoint: format!("{}/render", server.uri()),
        token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
        settle_delay: Duration::from_millis(250),
        max_bytes: 1024,
    }
}

#[tokio::test]
async fn posts_url_with_wait_parameters_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(serde_json::json!({
            "url": "https://spa.example/page",
            "waitMs": 250,
            "timeoutMs": 5000
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>rendered</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = RenderApiFetcher::new(settings(&server, Some("secret-token"))).expect("client");
    let content = fetcher.fetch("https://spa.example/page").await.expect("render ok");

    assert_eq!(content.bytes, b"<html><body>rendered</body></html>");
    assert_eq!(content.final_url, "https://spa.example/page");
}

#[tokio::test]
async fn non_success_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let fetcher = RenderApiFetcher::new(settings(&server, None)).expect("client");
    let err = fetcher
        .fetch("https://spa.example/page")
        .await
        .expect_err("502 must fail");
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
}

#[tokio::test]
async fn rendered_body_over_the_cap_is_rejected() {
    let server = MockServer::start().await;
    let huge = format!("<html><body>{}</body></html>", "x".repeat(4096));
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(huge, "text/html"))
        .mount(&server)
        .await;

    let fetcher = RenderApiFetcher::new(settings(&server, None)).expect("client");
    let err = fetcher
        .fetch("https://spa.example/page")
        .await
        .expect_err("body over the cap must fail");
    assert!(matches!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 1024,
            ..
        }
    ));
}
