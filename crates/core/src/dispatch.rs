//! Format dispatcher (C5/§4.4) — the ordered detection pipeline. Order is
//! load-bearing: earlier probes pre-empt later ones, and a race between
//! two probes for the same page is forbidden (spec §5 ordering guarantee).

use crate::error::ParseError;
use crate::extract::{model01, preformatted, simple, tabular, ExtractedEntry};
use crate::html_util;
use crate::remote_gate::{self, ConcurrencyCap, HttpFetcher};
use crate::types::Dialect;
use scraper::Html;

/// Outcome of one full dispatch pass: the entries found (possibly none)
/// and the dialect tag that produced them, if any extractor matched.
pub struct DispatchResult {
    pub entries: Vec<ExtractedEntry>,
    pub dialect: Option<Dialect>,
    /// Named-header count of the winning table, if any (tabular tie-break
    /// bookkeeping, kept on the result per the data model's `headerCount`).
    pub header_count: usize,
}

macro_rules! try_probe {
    ($probe:expr, $dialect:expr) => {
        if let Some(outcome) = $probe {
            if !outcome.is_empty() {
                return Ok(DispatchResult { entries: outcome.entries, dialect: Some($dialect), header_count: outcome.header_count });
            }
        }
    };
}

/// Run the ordered pipeline. `concurrency` is clamped to `1` the moment a
/// Google-Drive index variant is detected (spec §4.4 step 2) — the one
/// cross-subsystem side effect this core performs.
pub async fn dispatch(
    doc: &Html,
    base_url: &str,
    fetcher: Option<&dyn HttpFetcher>,
    concurrency: &ConcurrencyCap,
) -> Result<DispatchResult, ParseError> {
    // 1. Host gate.
    if let Some(dialect) = remote_gate::host_backend(base_url) {
        let entries = match dialect {
            Dialect::Ipfs => simple::ipfs(doc, base_url).map(|o| o.entries).unwrap_or_default(),
            // Blitzfiles' own wire protocol is opaque to this core (spec §6).
            _ => Vec::new(),
        };
        return Ok(DispatchResult { entries, dialect: Some(dialect), header_count: 0 });
    }

    // 2. Script scan for the Google-Drive index family.
    let script_sel = html_util::selector("script");
    for script in doc.select(&script_sel) {
        let Some(src) = script.value().attr("src") else { continue };
        if let Some(dialect) = remote_gate::classify_script(src, base_url, fetcher).await? {
            concurrency.clamp_to_one();
            return Ok(DispatchResult { entries: Vec::new(), dialect: Some(dialect), header_count: 0 });
        }
    }

    // 3 & 4. Ordered structural probes (noise removal is folded into each
    // extractor's own row filtering — see `simple::is_chrome`).
    try_probe!(simple::directory_listing_com(doc, base_url), Dialect::DirectoryListingCom);
    try_probe!(simple::h5ai(doc, base_url), Dialect::H5ai);
    try_probe!(simple::snif(doc, base_url), Dialect::Snif);

    match simple::pure_godir(doc, base_url)? {
        Some(outcome) if !outcome.is_empty() => {
            return Ok(DispatchResult { entries: outcome.entries, dialect: Some(Dialect::PureGodir), header_count: 0 })
        }
        _ => {}
    }

    try_probe!(simple::custom_div1(doc, base_url), Dialect::CustomDiv1);
    try_probe!(simple::custom_div2(doc, base_url), Dialect::CustomDiv2);
    try_probe!(simple::hfs(doc, base_url), Dialect::Hfs);
    try_probe!(preformatted::extract(doc, base_url), Dialect::PreFormatted);
    try_probe!(simple::javascript_drawn(doc, base_url), Dialect::JavaScriptDrawn);
    try_probe!(simple::ul_root(doc, base_url), Dialect::UlRoot);
    try_probe!(tabular::extract(doc, base_url), Dialect::ParseTablesDirectoryListing);
    try_probe!(simple::mdui_list(doc, base_url), Dialect::MduiList);
    try_probe!(simple::directory_lister(doc, base_url), Dialect::DirectoryLister);
    try_probe!(simple::list_group(doc, base_url), Dialect::ListGroup);
    try_probe!(simple::generic_ul(doc, base_url), Dialect::GenericUl);
    try_probe!(simple::anchor_only_fallback(doc, base_url), Dialect::AnchorOnlyFallback);

    // 5. Model-01 is attempted regardless of whether a prior probe matched.
    if let Some(outcome) = model01::extract(doc, base_url, fetcher).await? {
        if !outcome.is_empty() {
            return Ok(DispatchResult { entries: outcome.entries, dialect: Some(Dialect::Model01), header_count: 0 });
        }
    }

    // 6. Diagnostic only: nothing populated and the page looks JS-rendered.
    let noscript_sel = html_util::selector("noscript");
    if doc.select(&noscript_sel).next().is_some() {
        tracing::warn!(url = base_url, "no extractor matched a populated listing; page contains <noscript>, probably a JavaScript challenge");
    }

    Ok(DispatchResult { entries: Vec::new(), dialect: None, header_count: 0 })
}
