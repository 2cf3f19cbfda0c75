#![cfg(unix)]

use std::fs;
use std::path::PathBuf;

use ingest_engine::{CommandGateway, ExtractOptions, ExtractionGateway, GatewayError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn command_line_carries_flags_and_skips_missing_config() {
    let gateway = CommandGateway::new(ExtractOptions {
        config_file: Some(PathBuf::from("/nonexistent/kreuzberg.toml")),
        ..ExtractOptions::default()
    });

    assert_eq!(
        gateway.command_args(&PathBuf::from("/in/a.pdf")),
        vec![
            "extract",
            "/in/a.pdf",
            "--output-format",
            "text",
            "--ocr",
            "true",
            "--force-ocr",
            "false",
            "--quality",
            "true"
        ]
    );
}

#[test]
fn existing_config_file_is_passed_through() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("kreuzberg.toml");
    fs::write(&config, "[ocr]\nbackend = \"tesseract\"\n").unwrap();
    let gateway = CommandGateway::new(ExtractOptions {
        config_file: Some(config.clone()),
        force_ocr: true,
        ..ExtractOptions::default()
    });

    let args = gateway.command_args(&PathBuf::from("/in/scan.png"));
    let position = args.iter().position(|arg| arg == "--config").expect("--config present");
    assert_eq!(args[position + 1], config.display().to_string());
    assert!(args.windows(2).any(|pair| pair == ["--force-ocr", "true"]));
}

#[tokio::test]
async fn stdout_of_the_service_is_the_extracted_text() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("a.pdf");
    fs::write(&input, "pdf").unwrap();
    // `echo` prints its arguments, which stands in for the extracted text.
    let gateway = CommandGateway::new(ExtractOptions {
        program: PathBuf::from("echo"),
        config_file: None,
        ..ExtractOptions::default()
    });

    let text = gateway.extract(&input).await.expect("echo succeeds");
    assert!(text.starts_with(&format!("extract {}", input.display())));
    assert!(text.contains("--output-format text"));
}

#[tokio::test]
async fn non_zero_exit_is_a_failure() {
    let gateway = CommandGateway::new(ExtractOptions {
        program: PathBuf::from("false"),
        config_file: None,
        ..ExtractOptions::default()
    });

    let err = gateway
        .extract(&PathBuf::from("/tmp/a.pdf"))
        .await
        .expect_err("false exits 1");
    assert!(matches!(err, GatewayError::Failed { .. }));
}

#[tokio::test]
async fn missing_program_cannot_spawn() {
    let gateway = CommandGateway::new(ExtractOptions {
        program: PathBuf::from("/nonexistent/kreuzberg"),
        ..ExtractOptions::default()
    });

    let err = gateway
        .extract(&PathBuf::from("/tmp/a.pdf"))
        .await
        .expect_err("no such program");
    assert!(matches!(err, GatewayError::Spawn { .. }));
}
