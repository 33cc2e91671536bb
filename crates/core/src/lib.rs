//! Open-directory listing parser core.
//!
//! Given a directory shell (its URL and an optional weak reference to the
//! directory that discovered it) plus the already-fetched HTML for that
//! URL, [`parse_html`] classifies the page's dialect, extracts its rows,
//! and runs the post-parse sanitizer — returning a fully populated
//! [`ParsedDirectory`], or a conservative `error = true` rather than
//! fabricated entries.
//!
//! The only I/O this crate performs is the two sub-fetches exposed
//! through [`HttpFetcher`]: a Google-Drive index script's sourcemap, and
//! the Model-01 JSON tree. Everything else — the HTTP(S)/FTP(S) client,
//! the crawl scheduler, persistence, and the actual remote-backend wire
//! protocols — is the caller's responsibility.

pub mod config;
pub mod dateparse;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod header;
pub mod html_util;
pub mod link_validator;
pub mod remote_gate;
pub mod sanitize;
pub mod types;
pub mod url_utils;

pub use config::ParserConfig;
pub use error::ParseError;
pub use remote_gate::{ConcurrencyCap, HttpFetcher};
pub use types::{ColumnMap, Dialect, HeaderInfo, HeaderType, ParsedDirectory, ParsedFile, UNKNOWN_SIZE};

use scraper::Html;
use std::sync::{Arc, RwLock};

/// Entry point with default configuration and an unbounded concurrency cap
/// (callers that need the Google-Drive clamp to be observable should use
/// [`parse_html_with`] and share one [`ConcurrencyCap`] across pages).
pub async fn parse_html(
    shell: ParsedDirectory,
    html: &str,
    http_client: Option<&dyn HttpFetcher>,
    check_parents: bool,
) -> Result<ParsedDirectory, ParseError> {
    parse_html_with(&ConcurrencyCap::new(usize::MAX), &ParserConfig::default(), shell, html, http_client, check_parents).await
}

/// Full entry point: `ParseHtml(webDirectory, html, httpClient?, checkParents)`
/// from spec §6, generalized with an explicit config and a shared
/// concurrency cap. `Cancelled` propagates to the caller unconverted; every
/// other failure collapses to `error = true` on the returned directory.
pub async fn parse_html_with(
    concurrency: &ConcurrencyCap,
    config: &ParserConfig,
    shell: ParsedDirectory,
    html: &str,
    http_client: Option<&dyn HttpFetcher>,
    check_parents: bool,
) -> Result<ParsedDirectory, ParseError> {
    let span = tracing::info_span!("parse_html", url = %shell.url);
    let _enter = span.enter();

    let arc = Arc::new(RwLock::new(shell));
    let doc = Html::parse_document(html);
    let base_url = arc.read().unwrap().url.clone();

    match dispatch::dispatch(&doc, &base_url, http_client, concurrency).await {
        Ok(result) => {
            let mut dir = arc.write().unwrap();
            dir.parser = result.dialect;
            dir.header_count = result.header_count;
            for entry in result.entries {
                match entry.kind {
                    extract::ExtractedKind::Directory => {
                        let mut child = ParsedDirectory::shell_named(entry.url, entry.name, Some(Arc::downgrade(&arc)));
                        child.description = entry.description;
                        dir.subdirectories.push(Arc::new(RwLock::new(child)));
                    }
                    extract::ExtractedKind::File => {
                        dir.files.push(ParsedFile {
                            url: entry.url,
                            file_name: entry.name,
                            file_size: entry.file_size.unwrap_or(UNKNOWN_SIZE),
                            description: entry.description,
                        });
                    }
                }
            }
            dir.parsed_successfully = true;
            dir.error = false;
        }
        Err(err) if err.is_cancelled() => return Err(err),
        Err(err) => {
            tracing::warn!(url = %base_url, error = %err, "directory parse failed");
            arc.write().unwrap().mark_error();
        }
    }

    {
        let mut dir = arc.write().unwrap();
        sanitize::sanitize(&mut dir, config, check_parents);
    }

    Ok(match Arc::try_unwrap(arc) {
        Ok(lock) => lock.into_inner().unwrap(),
        // Only reachable if a caller stashed another strong clone of the
        // shell before calling us; fall back to a deep copy.
        Err(arc) => arc.read().unwrap().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn s1_apache_autoindex_table() {
        let html = r#"
            <table>
              <tr><th>Name</th><th>Last modified</th><th>Size</th></tr>
              <tr><td><img alt="[DIR]"></td><td><a href="sub/">sub/</a></td><td>-</td></tr>
              <tr><td><img alt="[   ]"></td><td><a href="a.txt">a.txt</a></td><td>12K</td></tr>
            </table>
        "#;
        let shell = ParsedDirectory::shell("http://h/p/", None);
        let result = parse_html(shell, html, None, true).await.unwrap();

        assert_eq!(result.parser, Some(Dialect::ParseTablesDirectoryListing));
        assert_eq!(result.subdirectories.len(), 1);
        let sub = result.subdirectories[0].read().unwrap();
        assert_eq!(sub.url, "http://h/p/sub/");
        assert_eq!(sub.name, "sub");
        drop(sub);

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].file_name, "a.txt");
        assert_eq!(result.files[0].url, "http://h/p/a.txt");
        assert_eq!(result.files[0].file_size, 12288);
    }

    #[tokio::test]
    async fn s2_unix_ls_in_pre() {
        let html = r#"<pre>drwxr-xr-x 4 u g 4096 Jan 1 10:00 <a href="d/">d</a></pre>"#;
        let shell = ParsedDirectory::shell("http://h/p/", None);
        let result = parse_html(shell, html, None, true).await.unwrap();
        assert_eq!(result.parser, Some(Dialect::PreFormatted));
        assert_eq!(result.subdirectories.len(), 1);
        assert_eq!(result.subdirectories[0].read().unwrap().name, "d");
    }

    #[tokio::test]
    async fn s3_pure_godir_breadcrumb_mismatch_is_error() {
        let html = r#"
            <div class="breadcrumb">/y/</div>
            <table class="listing-table"><tbody><tr><td><a href="a.txt">a.txt</a></td></tr></tbody></table>
        "#;
        let shell = ParsedDirectory::shell("http://h/x/", None);
        let result = parse_html(shell, html, None, true).await.unwrap();
        assert!(result.error);
        assert!(result.files.is_empty());
        assert!(result.subdirectories.is_empty());
    }

    #[tokio::test]
    async fn s4_sort_link_text_name_is_rejected() {
        let html = r#"<table><tr><td><a href="?C=N;O=A">Name</a></td></tr></table>"#;
        let shell = ParsedDirectory::shell("http://h/p/", None);
        let result = parse_html(shell, html, None, true).await.unwrap();
        assert!(result.subdirectories.is_empty());
        assert!(result.files.is_empty());
    }

    #[tokio::test]
    async fn s7_linux_pseudo_dir_pruning() {
        let html = r#"
            <table>
              <tr><td><img alt="[DIR]"><a href="1/">1/</a></td></tr>
              <tr><td><img alt="[DIR]"><a href="2/">2/</a></td></tr>
              <tr><td><img alt="[DIR]"><a href="self/">self/</a></td></tr>
            </table>
        "#;
        let shell = ParsedDirectory::shell("http://h/proc/", None);
        let result = parse_html(shell, html, None, true).await.unwrap();
        assert!(result.subdirectories.is_empty());
    }

    #[tokio::test]
    async fn closure_under_host_property() {
        let html = r#"
            <table>
              <tr><td><a href="a.txt">a.txt</a></td></tr>
              <tr><td><a href="https://evil.example/x">x</a></td></tr>
            </table>
        "#;
        let shell = ParsedDirectory::shell("http://h/p/", None);
        let result = parse_html(shell, html, None, true).await.unwrap();
        for f in &result.files {
            let host = url::Url::parse(&f.url).unwrap().host_str().unwrap().to_string();
            assert_eq!(host, "h");
        }
    }
}
