use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use ingest_core::{derive_fetch_filename, file_output_path, url_output_path, NamingOptions};
use pretty_assertions::assert_eq;

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
}

#[test]
fn supplied_name_gets_content_extension() {
    let now = fixed_now();
    assert_eq!(derive_fetch_filename("https://a.example", Some("x"), now), "x.html");
    assert_eq!(
        derive_fetch_filename("https://a.example", Some("page.HTML"), now),
        "page.HTML"
    );
    assert_eq!(
        derive_fetch_filename("https://a.example", Some("../evil"), now),
        ".._evil.html"
    );
}

#[test]
fn name_is_derived_from_url_path() {
    let url = "https://a.example/docs/getting-started?x=1";
    let name = derive_fetch_filename(url, None, fixed_now());
    assert_eq!(name, "docs_getting_started.html");
}

#[test]
fn empty_path_falls_back_to_hostname() {
    let name = derive_fetch_filename("https://www.a.example/", None, fixed_now());
    assert_eq!(name, "www_a_example.html");
}

#[test]
fn unparseable_url_falls_back_to_timestamp() {
    let name = derive_fetch_filename("::nope::", None, fixed_now());
    assert_eq!(name, "url_20240305_070809.html");
}

#[test]
fn file_output_preserves_structure_when_enabled() {
    let options = NamingOptions {
        timestamp_suffix: false,
        preserve_structure: true,
    };
    let input = Path::new("reports/q1.pdf");
    let path = file_output_path(Path::new("/out"), input, options, fixed_now());
    assert_eq!(path, PathBuf::from("/out/reports/q1.txt"));
}

#[test]
fn file_output_flattens_and_adds_timestamp() {
    let options = NamingOptions {
        timestamp_suffix: true,
        preserve_structure: false,
    };
    let input = Path::new("reports/q1.pdf");
    let path = file_output_path(Path::new("/out"), input, options, fixed_now());
    assert_eq!(path, PathBuf::from("/out/q1_20240305_070809.txt"));
}

#[test]
fn url_output_lives_under_urls_dir() {
    let path = url_output_path(
        Path::new("/out"),
        "docs_intro.html",
        NamingOptions::default(),
        fixed_now(),
    );
    assert_eq!(path, PathBuf::from("/out/urls/docs_intro.txt"));
}
