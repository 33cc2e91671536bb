//! End-to-end scenarios and quantified properties exercised through the
//! crate's public `parse_html` entry point, one HTML page at a time.

use odlister_core::{parse_html, ConcurrencyCap, Dialect, ParseError, ParsedDirectory, ParserConfig};
use std::sync::{Arc, RwLock};

#[tokio::test]
async fn s5_symlink_loop_against_root() {
    let root_shell = ParsedDirectory::shell("http://h/a/", None);
    let root = Arc::new(RwLock::new(root_shell));
    root.write().unwrap().files.push(odlister_core::ParsedFile {
        url: "http://h/a/x".into(),
        file_name: "x".into(),
        file_size: 1,
        description: None,
    });

    let child_shell = ParsedDirectory::shell_named("http://h/a/b/", "b", Some(Arc::downgrade(&root)));
    let html = r#"<table><tr><td><a href="x">x</a></td><td>1</td></tr></table>"#;
    let child = parse_html(child_shell, html, None, false).await.unwrap();

    assert!(child.error, "directory structurally identical to an ancestor must be flagged");
    assert!(child.files.is_empty());
    assert!(child.subdirectories.is_empty());
}

#[tokio::test]
async fn s6_google_drive_script_clamps_concurrency() {
    let html = r#"<html><head><script src="/assets/bhadoo.index.js"></script></head><body></body></html>"#;
    let cap = ConcurrencyCap::new(8);
    let cfg = ParserConfig::default();
    let shell = ParsedDirectory::shell("http://h/p/", None);
    let result = odlister_core::parse_html_with(&cap, &cfg, shell, html, None, true).await.unwrap();

    assert_eq!(result.parser, Some(Dialect::GoogleDriveBhadoo));
    assert_eq!(cap.get(), 1);
}

#[tokio::test]
async fn property_size_is_never_negative_except_sentinel() {
    let html = r#"
        <table>
          <tr><th>Name</th><th>Size</th></tr>
          <tr><td><a href="a.txt">a.txt</a></td><td>12K</td></tr>
          <tr><td><a href="b.txt">b.txt</a></td><td>-</td></tr>
        </table>
    "#;
    let shell = ParsedDirectory::shell("http://h/p/", None);
    let result = parse_html(shell, html, None, true).await.unwrap();
    for f in &result.files {
        assert!(f.file_size >= 0 || f.file_size == odlister_core::UNKNOWN_SIZE);
    }
}

#[tokio::test]
async fn property_idempotent_sanitize() {
    let html = r#"
        <table>
          <tr><th>Name</th><th>Size</th></tr>
          <tr><td><a href="sub/">sub/</a></td><td>-</td></tr>
          <tr><td><a href="a.txt#frag">a.txt</a></td><td>12K</td></tr>
        </table>
    "#;
    let shell = ParsedDirectory::shell("http://h/p/", None);
    let once = parse_html(shell, html, None, true).await.unwrap();

    let cfg = ParserConfig::default();
    let mut twice = once.clone();
    odlister_core::sanitize::sanitize(&mut twice, &cfg, true);

    assert_eq!(once.files.len(), twice.files.len());
    assert_eq!(once.subdirectories.len(), twice.subdirectories.len());
    for (a, b) in once.files.iter().zip(twice.files.iter()) {
        assert_eq!(a.url, b.url);
    }
}

#[tokio::test]
async fn property_fragment_absent_on_http_entries() {
    let html = r#"<table><tr><td><a href="a.txt#section">a.txt</a></td><td>42</td></tr></table>"#;
    let shell = ParsedDirectory::shell("http://h/p/", None);
    let result = parse_html(shell, html, None, true).await.unwrap();
    for f in &result.files {
        assert!(!f.url.contains('#'));
    }
}

#[tokio::test]
async fn cancelled_error_propagates_instead_of_converting() {
    struct CancellingFetcher;
    #[async_trait::async_trait]
    impl odlister_core::HttpFetcher for CancellingFetcher {
        async fn fetch_text(&self, _url: &str) -> Result<String, ParseError> {
            Err(ParseError::Cancelled)
        }
    }

    let html = r#"<html><head><script src="/assets/app.min.js"></script></head><body></body></html>"#;
    let shell = ParsedDirectory::shell("http://h/p/", None);
    let fetcher = CancellingFetcher;
    let result = parse_html(shell, html, Some(&fetcher), true).await;

    assert!(matches!(result, Err(ParseError::Cancelled)));
}
