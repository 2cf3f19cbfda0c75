use std::fs;
use std::path::{Path, PathBuf};

use ingest_engine::{Discovery, Inputs};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn touch(root: &Path, relative: &str, body: &str) {
    let target = root.join(relative);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(target, body).unwrap();
}

fn relatives(inputs: &Inputs) -> (Vec<PathBuf>, Vec<PathBuf>) {
    (
        inputs.url_lists.iter().map(|f| f.relative.clone()).collect(),
        inputs.documents.iter().map(|f| f.relative.clone()).collect(),
    )
}

#[tokio::test]
async fn recursive_scan_classifies_and_filters() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("in");
    touch(&root, "links.txt", "https://example.com/a\n");
    touch(&root, "notes.txt", "meeting notes\n");
    touch(&root, "reports/q1.pdf", "pdf");
    touch(&root, ".hidden/secret.pdf", "pdf");
    touch(&root, "upload.pdf.part", "partial");
    touch(&root, "out/already.txt", "extracted");

    let inputs = Discovery::new(&root, true)
        .exclude(root.join("out"))
        .scan()
        .await
        .unwrap();

    let (lists, documents) = relatives(&inputs);
    assert_eq!(lists, vec![PathBuf::from("links.txt")]);
    assert_eq!(
        documents,
        vec![PathBuf::from("notes.txt"), PathBuf::from("reports/q1.pdf")]
    );
    assert_eq!(inputs.documents[1].path, root.join("reports/q1.pdf"));
}

#[tokio::test]
async fn non_recursive_scan_stays_at_the_top_level() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "a.pdf", "pdf");
    touch(temp.path(), "nested/b.pdf", "pdf");

    let inputs = Discovery::new(temp.path(), false).scan().await.unwrap();

    assert_eq!(relatives(&inputs).1, vec![PathBuf::from("a.pdf")]);
}

#[tokio::test]
async fn missing_root_yields_no_inputs() {
    let temp = TempDir::new().unwrap();
    let inputs = Discovery::new(temp.path().join("absent"), true)
        .scan()
        .await
        .unwrap();
    assert_eq!(inputs, Inputs::default());
}

#[cfg(unix)]
#[tokio::test]
async fn broken_entry_is_skipped_and_links_are_followed() {
    use std::os::unix::fs::symlink;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("in");
    let elsewhere = temp.path().join("elsewhere");
    touch(&root, "a.pdf", "pdf");
    touch(&elsewhere, "shared/c.pdf", "pdf");
    touch(&elsewhere, "linked.docx", "docx");
    symlink(elsewhere.join("shared"), root.join("shared")).unwrap();
    symlink(elsewhere.join("linked.docx"), root.join("linked.docx")).unwrap();
    symlink(temp.path().join("nowhere"), root.join("dangling.pdf")).unwrap();

    let inputs = Discovery::new(&root, true).scan().await.unwrap();

    assert_eq!(
        relatives(&inputs).1,
        vec![
            PathBuf::from("a.pdf"),
            PathBuf::from("linked.docx"),
            PathBuf::from("shared/c.pdf"),
        ]
    );
}
