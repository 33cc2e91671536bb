//! Model-01 JSON-backed listing (§4.4 step 5) — a `div.filemanager` whose
//! paired `script[src*=script.js]` contains a `$.get('<index>')` call.
//! Fetch that script, recover the index URL, fetch and deserialize a
//! `{ name, path, type, size, items[] }` tree, and emit this directory's
//! immediate children (recursion into `items[].items` is the crawler's
//! concern, not this parser's — spec's non-goal on recursion).

use crate::error::ParseError;
use crate::extract::{ExtractedEntry, ExtractionOutcome};
use crate::html_util::selector;
use crate::remote_gate::HttpFetcher;
use crate::types::UNKNOWN_SIZE;
use crate::url_utils::resolve;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::OnceLock;

/// A sub-fetch that isn't `Cancelled` is a lost signal, not a hard failure
/// (spec §7 `SubfetchFailure`): swallow it here and let the caller fall
/// through to the next probe. `Cancelled` alone propagates.
async fn fetch_or_swallow(fetcher: &dyn HttpFetcher, url: &str) -> Result<Option<String>, ParseError> {
    match fetcher.fetch_text(url).await {
        Ok(text) => Ok(Some(text)),
        Err(ParseError::Cancelled) => Err(ParseError::Cancelled),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct Model01Node {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    items: Vec<Model01Node>,
}

fn script_get_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\$\.get\(\s*['"]([^'"]+)['"]"#).unwrap())
}

async fn locate_index_url(doc: &Html, base_url: &str, fetcher: &dyn HttpFetcher) -> Result<Option<String>, ParseError> {
    let container_sel = selector("div.filemanager");
    if doc.select(&container_sel).next().is_none() {
        return Ok(None);
    }

    let script_sel = selector(r#"script[src*="script.js"]"#);
    let Some(script_src) = doc.select(&script_sel).next().and_then(|s| s.value().attr("src")) else {
        return Ok(None);
    };
    let Some(abs_script) = resolve(base_url, script_src) else { return Ok(None) };
    let Some(js) = fetch_or_swallow(fetcher, &abs_script).await? else { return Ok(None) };
    let Some(caps) = script_get_re().captures(&js) else { return Ok(None) };
    Ok(resolve(base_url, &caps[1]))
}

fn push_child(node: &Model01Node, base_url: &str, entries: &mut Vec<ExtractedEntry>) {
    let Some(abs) = resolve(base_url, &node.path) else { return };
    match node.kind.to_lowercase().as_str() {
        "folder" | "directory" | "dir" => entries.push(ExtractedEntry::directory(abs, node.name.clone())),
        _ => entries.push(ExtractedEntry::file(abs, node.name.clone(), node.size.unwrap_or(UNKNOWN_SIZE))),
    }
}

pub async fn extract(
    doc: &Html,
    base_url: &str,
    fetcher: Option<&dyn HttpFetcher>,
) -> Result<Option<ExtractionOutcome>, ParseError> {
    let Some(fetcher) = fetcher else { return Ok(None) };
    let Some(index_url) = locate_index_url(doc, base_url, fetcher).await? else { return Ok(None) };
    let Some(json) = fetch_or_swallow(fetcher, &index_url).await? else { return Ok(None) };
    let Ok(root) = serde_json::from_str::<Model01Node>(&json) else { return Ok(None) };

    let mut entries = Vec::new();
    for child in &root.items {
        push_child(child, base_url, &mut entries);
    }
    Ok(if entries.is_empty() { None } else { Some(ExtractionOutcome::new(entries, 0)) })
}
