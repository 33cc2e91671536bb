//! Simple list/div/anchor extractors (C4/§4.7) — every dialect that isn't
//! the generic table or the preformatted-text family. Each shares the same
//! shape: iterate candidate elements, find a validated anchor, resolve the
//! URL, read a size from a sibling/attribute, classify directory vs file.

use crate::extract::{ExtractedEntry, ExtractionOutcome};
use crate::html_util::{self, has_img, valid_anchor};
use crate::link_validator::is_valid_entry_link;
use crate::types::UNKNOWN_SIZE;
use crate::url_utils::{parse_file_size, resolve};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

fn text_trim(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join("").trim().to_string()
}

fn class_list(el: ElementRef<'_>) -> Vec<&str> {
    el.value().attr("class").map(|c| c.split_whitespace().collect()).unwrap_or_default()
}

fn has_class(el: ElementRef<'_>, name: &str) -> bool {
    class_list(el).iter().any(|c| *c == name)
}

fn looks_like_directory_href(href: &str) -> bool {
    href.split('?').next().unwrap_or(href).ends_with('/')
}

/// `#directory-listing li` / `.directory-listing li` (DirectoryListing.com).
pub fn directory_listing_com(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("#directory-listing li, .directory-listing li");
    extract_anchor_rows(doc.select(&sel), base_url, |li, _href| has_class(li, "folder") || has_img(li))
}

/// `#fallback table tr` (h5ai noscript fallback table).
pub fn h5ai(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let row_sel = html_util::selector("#fallback table tr");
    let cell_sel = html_util::selector("td");
    let mut entries = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(anchor) = valid_anchor(row) else { continue };
        if anchor.text.to_lowercase().contains("parent directory") {
            continue;
        }
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let cells: Vec<_> = row.select(&cell_sel).collect();
        let size_text = cells.get(2).map(|c| text_trim(*c));
        push_entry(&mut entries, abs, anchor.text, looks_like_directory_href(anchor.href), size_text.as_deref());
    }
    finish(entries)
}

/// `table.snif tr`.
pub fn snif(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let row_sel = html_util::selector("table.snif tr");
    let cell_sel = html_util::selector("td");
    let mut entries = Vec::new();
    for row in doc.select(&row_sel) {
        if has_class(row, "snHeading") {
            continue;
        }
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let cells: Vec<_> = row.select(&cell_sel).collect();
        let size_text = cells.get(1).map(|c| text_trim(*c));
        push_entry(&mut entries, abs, anchor.text, looks_like_directory_href(anchor.href), size_text.as_deref());
    }
    finish(entries)
}

/// `table.listing-table tbody tr` (Pure/Godir), gated on the breadcrumb
/// matching the directory's own path (spec §9 open question (c): accept
/// either the raw or percent-encoded breadcrumb text).
pub fn pure_godir(doc: &Html, base_url: &str) -> Result<Option<ExtractionOutcome>, crate::error::ParseError> {
    let row_sel = html_util::selector("table.listing-table tbody tr");
    if doc.select(&row_sel).next().is_none() {
        return Ok(None);
    }

    let breadcrumb_sel = html_util::selector(".breadcrumb");
    if let Some(breadcrumb) = doc.select(&breadcrumb_sel).next() {
        let rendered = text_trim(breadcrumb);
        let expected_path = url::Url::parse(base_url).ok().map(|u| u.path().to_string()).unwrap_or_default();
        let expected_encoded: String =
            percent_encoding::utf8_percent_encode(&expected_path, percent_encoding::NON_ALPHANUMERIC).to_string();
        if rendered != expected_path && rendered != expected_encoded {
            return Err(crate::error::ParseError::Friendly("Pure/Godir breadcrumb does not match directory path".into()));
        }
    }

    let cell_sel = html_util::selector("td");
    let mut entries = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let cells: Vec<_> = row.select(&cell_sel).collect();
        let size_text = cells.get(1).map(|c| text_trim(*c));
        push_entry(&mut entries, abs, anchor.text, looks_like_directory_href(anchor.href), size_text.as_deref());
    }
    Ok(finish(entries))
}

/// `div#listing div` — size text in `<em>`, name in `<strong>`.
pub fn custom_div1(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let row_sel = html_util::selector("div#listing > div");
    let em_sel = html_util::selector("em");
    let strong_sel = html_util::selector("strong");
    let mut entries = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let name = row.select(&strong_sel).next().map(text_trim).filter(|s| !s.is_empty()).unwrap_or(anchor.text);
        let size_text = row.select(&em_sel).next().map(text_trim);
        push_entry(&mut entries, abs, name, looks_like_directory_href(anchor.href), size_text.as_deref());
    }
    finish(entries)
}

/// `div#filelist .tb-row.folder|.afile` — folders carry `data-href`, files
/// carry a `.sz` size element.
pub fn custom_div2(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("div#filelist .tb-row.folder, div#filelist .tb-row.afile");
    let sz_sel = html_util::selector(".sz");
    let mut entries = Vec::new();
    for row in doc.select(&sel) {
        let is_folder = has_class(row, "folder");
        if is_folder {
            let Some(href) = row.value().attr("data-href") else { continue };
            let Some(abs) = resolve(base_url, href) else { continue };
            let name = text_trim(row);
            entries.push(ExtractedEntry::directory(abs, name));
        } else {
            let Some(anchor) = valid_anchor(row) else { continue };
            let Some(abs) = resolve(base_url, anchor.href) else { continue };
            let size_text = row.select(&sz_sel).next().map(text_trim);
            let size = size_text.as_deref().and_then(parse_file_size).unwrap_or(UNKNOWN_SIZE);
            entries.push(ExtractedEntry::file(abs, anchor.text, size));
        }
    }
    finish(entries)
}

/// `div#files .item` (HFS) — directory vs file via `item-type-folder`.
pub fn hfs(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("div#files .item");
    let mut entries = Vec::new();
    for row in doc.select(&sel) {
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let is_dir = has_class(row, "item-type-folder");
        push_entry(&mut entries, abs, anchor.text, is_dir, None);
    }
    finish(entries)
}

/// `ul#root li`.
pub fn ul_root(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("ul#root > li");
    extract_anchor_rows(doc.select(&sel), base_url, |li, href| has_img(li) || looks_like_directory_href(href))
}

/// `ul.mdui-list li` (Material-Design list). Honors `data-sort-name` /
/// `data-sort-date` / `data-sort-size` attributes when present; the three
/// header variants (icon+data-sort, `?sortby=` anchors, text-only) only
/// affect header detection upstream, not row extraction itself.
pub fn mdui_list(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("ul.mdui-list > li");
    let mut entries = Vec::new();
    for row in doc.select(&sel) {
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let name = row.value().attr("data-sort-name").map(str::to_string).unwrap_or_else(|| anchor.text.clone());
        let size_text = row.value().attr("data-sort-size").map(str::to_string);
        let is_dir = has_img(row) || looks_like_directory_href(anchor.href);
        push_entry(&mut entries, abs, name, is_dir, size_text.as_deref());
    }
    finish(entries)
}

/// `#content ul#file-list li` — Directory-Lister. Recognized via
/// `<i class="fa-folder">` vs. file; only fires when each row carries the
/// expected two-child shape (icon + link), distinguishing it from a bare
/// generic `ul li` fallback.
pub fn directory_lister(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("#content ul#file-list > li");
    let icon_sel = html_util::selector("i.fa-folder");
    let mut entries = Vec::new();
    for row in doc.select(&sel) {
        if html_util::element_child_count(row) != 2 {
            continue;
        }
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let is_dir = row.select(&icon_sel).next().is_some();
        push_entry(&mut entries, abs, anchor.text, is_dir, None);
    }
    finish(entries)
}

/// `.list-group li`.
pub fn list_group(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector(".list-group > li, .list-group-item");
    extract_anchor_rows(doc.select(&sel), base_url, |li, href| has_img(li) || looks_like_directory_href(href))
}

/// Plain `ul li` fallback, once every more specific UL dialect has failed.
pub fn generic_ul(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("ul > li");
    extract_anchor_rows(doc.select(&sel), base_url, |li, href| has_img(li) || looks_like_directory_href(href))
}

/// Elements inside `<nav>`/`<head>`, `#sidebar`, or `.breadcrumb` are page
/// chrome, not listing rows (spec §4.4 step 3 noise removal).
fn is_chrome(el: ElementRef<'_>) -> bool {
    html_util::ancestors(el).any(|anc| {
        matches!(anc.value().name(), "nav" | "head")
            || anc.value().attr("id") == Some("sidebar")
            || has_class(anc, "breadcrumb")
    })
}

/// Last-resort: every validated `<a>` on the page, outside page chrome.
pub fn anchor_only_fallback(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let sel = html_util::selector("a");
    let mut entries = Vec::new();
    for a in doc.select(&sel) {
        if is_chrome(a) {
            continue;
        }
        let Some(href) = a.value().attr("href") else { continue };
        let text = text_trim(a);
        let title = a.value().attr("title");
        if !is_valid_entry_link(href, &text, title) {
            continue;
        }
        let Some(abs) = resolve(base_url, href) else { continue };
        push_entry(&mut entries, abs, text, looks_like_directory_href(href), None);
    }
    finish(entries)
}

/// `td:nth-child(3)` as size (structural IPFS gateway listing table).
pub fn ipfs(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let row_sel = html_util::selector("table tr");
    let cell_sel = html_util::selector("td");
    let mut entries = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(anchor) = valid_anchor(row) else { continue };
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let cells: Vec<_> = row.select(&cell_sel).collect();
        let size_text = cells.get(2).map(|c| text_trim(*c));
        push_entry(&mut entries, abs, anchor.text, looks_like_directory_href(anchor.href), size_text.as_deref());
    }
    finish(entries)
}

fn js_directory_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"_d\(\s*['"]([^'"]*)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#).unwrap())
}

fn js_file_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"_f\(\s*['"]([^'"]*)['"]\s*,\s*['"]([^'"]*)['"]\s*,\s*['"]?([^,'")]*)['"]?"#).unwrap())
}

/// JavaScript-drawn listing: inline `_d("name","url")` / `_f("name","url","size", ...)`
/// calls, matched directly against the serialized document text.
pub fn javascript_drawn(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let html = doc.html();
    let mut entries = Vec::new();
    for caps in js_directory_call_re().captures_iter(&html) {
        let name = caps[1].to_string();
        if let Some(abs) = resolve(base_url, &caps[2]) {
            entries.push(ExtractedEntry::directory(abs, name));
        }
    }
    for caps in js_file_call_re().captures_iter(&html) {
        let name = caps[1].to_string();
        let Some(abs) = resolve(base_url, &caps[2]) else { continue };
        let size = parse_file_size(&caps[3]).unwrap_or(UNKNOWN_SIZE);
        entries.push(ExtractedEntry::file(abs, name, size));
    }
    finish(entries)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn push_entry(entries: &mut Vec<ExtractedEntry>, url: String, name: String, is_dir: bool, size_text: Option<&str>) {
    if is_dir {
        entries.push(ExtractedEntry::directory(url, name));
    } else {
        let size = size_text.and_then(parse_file_size).unwrap_or(UNKNOWN_SIZE);
        entries.push(ExtractedEntry::file(url, name, size));
    }
}

fn finish(entries: Vec<ExtractedEntry>) -> Option<ExtractionOutcome> {
    if entries.is_empty() {
        None
    } else {
        Some(ExtractionOutcome::new(entries, 0))
    }
}

fn extract_anchor_rows<'a>(
    rows: impl Iterator<Item = ElementRef<'a>>,
    base_url: &str,
    is_directory: impl Fn(ElementRef<'a>, &str) -> bool,
) -> Option<ExtractionOutcome> {
    let mut entries = Vec::new();
    for row in rows {
        if is_chrome(row) {
            continue;
        }
        let Some(anchor) = valid_anchor(row) else { continue };
        if anchor.text.to_lowercase().contains("parent directory") {
            continue;
        }
        let Some(abs) = resolve(base_url, anchor.href) else { continue };
        let is_dir = is_directory(row, anchor.href);
        push_entry(&mut entries, abs, anchor.text, is_dir, None);
    }
    finish(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_listing_com_basic() {
        let html = r#"<ul class="directory-listing"><li class="folder"><a href="sub/">sub</a></li></ul>"#;
        let doc = Html::parse_document(html);
        let outcome = directory_listing_com(&doc, "http://h/p/").unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].kind, crate::extract::ExtractedKind::Directory);
    }

    #[test]
    fn custom_div2_folder_and_file() {
        let html = r#"
            <div id="filelist">
              <div class="tb-row folder" data-href="sub/">sub</div>
              <div class="tb-row afile"><a href="a.txt">a.txt</a><span class="sz">10</span></div>
            </div>
        "#;
        let doc = Html::parse_document(html);
        let outcome = custom_div2(&doc, "http://h/p/").unwrap();
        assert_eq!(outcome.entries.len(), 2);
    }

    #[test]
    fn hfs_item_type_folder() {
        let html = r#"<div id="files"><div class="item item-type-folder"><a href="sub/">sub</a></div></div>"#;
        let doc = Html::parse_document(html);
        let outcome = hfs(&doc, "http://h/p/").unwrap();
        assert_eq!(outcome.entries[0].kind, crate::extract::ExtractedKind::Directory);
    }

    #[test]
    fn pure_godir_rejects_breadcrumb_mismatch() {
        let html = r#"
            <div class="breadcrumb">/y/</div>
            <table class="listing-table"><tbody><tr><td><a href="a.txt">a.txt</a></td></tr></tbody></table>
        "#;
        let doc = Html::parse_document(html);
        let result = pure_godir(&doc, "http://h/x/");
        assert!(result.is_err());
    }

    #[test]
    fn pure_godir_accepts_matching_breadcrumb() {
        let html = r#"
            <div class="breadcrumb">/x/</div>
            <table class="listing-table"><tbody><tr><td><a href="a.txt">a.txt</a></td></tr></tbody></table>
        "#;
        let doc = Html::parse_document(html);
        let result = pure_godir(&doc, "http://h/x/").unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn javascript_drawn_parses_calls() {
        let html = r#"<script>_d("sub","sub/");_f("a.txt","a.txt","1024");</script>"#;
        let doc = Html::parse_document(html);
        let outcome = javascript_drawn(&doc, "http://h/p/").unwrap();
        assert_eq!(outcome.entries.len(), 2);
    }

    #[test]
    fn anchor_only_fallback_skips_nav() {
        let html = r#"<nav><a href="skip/">skip</a></nav><a href="a.txt">a.txt</a>"#;
        let doc = Html::parse_document(html);
        let outcome = anchor_only_fallback(&doc, "http://h/p/").unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].name, "a.txt");
    }
}
