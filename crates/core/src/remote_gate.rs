//! Remote-strategy gate (C6): recognize host- or script-keyed special
//! backends (IPFS, Blitzfiles, Google-Drive-family index scripts) and
//! report which opaque strategy should run. The strategies' own wire
//! protocols are external collaborators (spec §6) — this module only
//! classifies and exposes the one cross-subsystem side effect the core is
//! allowed to perform: clamping the crawler's concurrency cap.

use crate::error::ParseError;
use crate::types::Dialect;
use crate::url_utils::resolve;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Hosts that entries are allowed to point at even though they aren't the
/// directory's own host (sanitizer containment check, spec §3 invariant 3).
pub const WHITELISTED_BACKEND_HOSTS: &[&str] =
    &["ipfs.io", "gateway.ipfs.io", "blitzfiles.tech", "drive.google.com", "docs.google.com"];

pub fn is_whitelisted_backend_host(host: &str) -> bool {
    WHITELISTED_BACKEND_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host))
}

/// Host-keyed dispatch: `ipfs.io`/`gateway.ipfs.io` → IPFS, `blitzfiles.tech`
/// → Blitzfiles. `None` means no host-gated backend applies.
pub fn host_backend(url: &str) -> Option<Dialect> {
    let host = url::Url::parse(url).ok()?.host_str()?.to_lowercase();
    match host.as_str() {
        "ipfs.io" | "gateway.ipfs.io" => Some(Dialect::Ipfs),
        "blitzfiles.tech" => Some(Dialect::Blitzfiles),
        _ => None,
    }
}

/// Script-URL-keyed classification for the Google-Drive index family
/// (`GoogleDriveIndexMapping.GetGoogleDriveIndexType` in spec §4.4 step 2).
pub fn classify_google_drive_script(script_src: &str) -> Option<Dialect> {
    let lower = script_src.to_lowercase();
    if lower.contains("bhadoo") {
        Some(Dialect::GoogleDriveBhadoo)
    } else if lower.contains("go2index") {
        Some(Dialect::GoogleDriveGo2Index)
    } else if lower.contains("goindex") {
        Some(Dialect::GoogleDriveGoIndex)
    } else if lower.contains("gdindex") || lower.contains("gd-index") {
        Some(Dialect::GoogleDriveGdIndex)
    } else {
        None
    }
}

fn is_app_min_js(script_src: &str) -> bool {
    script_src.to_lowercase().contains("app.min.js")
}

fn sourcemap_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//#\s*sourceMappingURL=(\S+)").unwrap())
}

fn extract_sourcemap_url(js_source: &str) -> Option<String> {
    sourcemap_comment_re().captures(js_source).map(|c| c[1].to_string())
}

fn extract_sourcemap_sources(sourcemap_json: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(sourcemap_json) else {
        return Vec::new();
    };
    value
        .get("sources")
        .and_then(|s| s.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Injected HTTP collaborator used only for the two in-core sub-fetches:
/// a Google-Drive `app.min.js` sourcemap, and the Model-01 JSON index.
/// Opaque beyond this — connection pooling, user-agent, retries are the
/// crawler's concern (spec §6 upstream contract).
#[async_trait::async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, ParseError>;
}

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

/// Classify a `<script src>` reference, following the `app.min.js` ->
/// sourcemap -> source-list retry path from spec §4.4 step 2 when a
/// fetcher is available.
pub async fn classify_script(
    script_src: &str,
    base_url: &str,
    fetcher: Option<&dyn HttpFetcher>,
) -> Result<Option<Dialect>, ParseError> {
    if let Some(d) = classify_google_drive_script(script_src) {
        return Ok(Some(d));
    }
    if !is_app_min_js(script_src) {
        return Ok(None);
    }
    let Some(fetcher) = fetcher else { return Ok(None) };
    let Some(abs_script) = resolve(base_url, script_src) else { return Ok(None) };
    let Some(js) = fetch_or_swallow(fetcher, &abs_script).await? else { return Ok(None) };
    let Some(map_ref) = extract_sourcemap_url(&js) else { return Ok(None) };
    let Some(abs_map) = resolve(&abs_script, &map_ref) else { return Ok(None) };
    let Some(map_json) = fetch_or_swallow(fetcher, &abs_map).await? else { return Ok(None) };
    for source in extract_sourcemap_sources(&map_json) {
        if let Some(d) = classify_google_drive_script(&source) {
            return Ok(Some(d));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Concurrency clamp — the one cross-page mutation this core performs
// ---------------------------------------------------------------------------

/// Shared handle to the crawler's `session.maxThreads`. Clamped to `1` the
/// moment a Google-Drive index variant is detected; never raised back up
/// by the core. A single atomic compare-and-swap, mutated from exactly one
/// call site (spec §9 design notes).
#[derive(Clone)]
pub struct ConcurrencyCap(Arc<AtomicUsize>);

impl ConcurrencyCap {
    pub fn new(initial: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(initial)))
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clamp_to_one(&self) {
        let _ = self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| Some(cur.min(1)));
    }
}

pub fn is_google_drive_dialect(dialect: Dialect) -> bool {
    matches!(
        dialect,
        Dialect::GoogleDriveBhadoo
            | Dialect::GoogleDriveGoIndex
            | Dialect::GoogleDriveGo2Index
            | Dialect::GoogleDriveGdIndex
    )
}
