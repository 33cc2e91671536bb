//! Generic table extractor (C4/§4.6) — the workhorse dialect. Handles
//! plain Apache/Nginx-style `<table>` autoindex markup: compute a
//! [`ColumnMap`] per table, classify each row as a directory or a file via
//! a disjunction of icon/class/query signals, and pick a name using the
//! documented preference order.

use crate::extract::{ExtractedEntry, ExtractionOutcome};
use crate::header::{self, CellSample};
use crate::html_util::{self, ancestors, has_img, img_alt, img_src, valid_anchor};
use crate::types::{ColumnMap, HeaderType};
use crate::url_utils::{parse_file_size, resolve};
use scraper::{ElementRef, Html};

fn cell_tags<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    header::element_children(row).filter(|c| matches!(c.value().name(), "td" | "th")).collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join("").trim().to_string()
}

fn element_has_class_containing(el: ElementRef<'_>, needle: &str) -> bool {
    let direct = el.value().attr("class").map(|c| c.to_lowercase().contains(needle)).unwrap_or(false);
    if direct {
        return true;
    }
    el.descendants().filter_map(ElementRef::wrap).any(|d| {
        d.value().attr("class").map(|c| c.to_lowercase().contains(needle)).unwrap_or(false)
    })
}

fn href_query_get(href: &str, key: &str) -> Option<String> {
    let query = href.split_once('?').map(|(_, q)| q).unwrap_or("");
    url::form_urlencoded::parse(query.as_bytes()).find(|(k, _)| k == key).map(|(_, v)| v.to_string())
}

fn is_directory_row(row: ElementRef<'_>, href: &str) -> bool {
    if row.value().attr("class").map(|c| c.split_whitespace().any(|cl| cl == "dir")).unwrap_or(false) {
        return true;
    }
    if element_has_class_containing(row, "folder") {
        return true;
    }
    if img_alt(row) == Some("[DIR]") {
        return true;
    }
    if let Some(src) = img_src(row) {
        let lowered = src.to_lowercase();
        if lowered.contains("dir") || lowered.contains("folder") {
            return true;
        }
    }
    for key in ["dirname", "dir", "directory", "folder"] {
        if href_query_get(href, key).is_some() {
            return true;
        }
    }
    false
}

fn is_file_row(is_dir: bool, href: &str, size_text: Option<&str>, has_size_header: bool) -> bool {
    if href_query_get(href, "file").is_some() {
        return true;
    }
    if is_dir || href_query_get(href, "dir").is_some() {
        return false;
    }
    let no_trailing_slash = !href.split('?').next().unwrap_or(href).ends_with('/');
    if !has_size_header && no_trailing_slash {
        return true;
    }
    if let Some(text) = size_text {
        let lowered = text.trim().to_lowercase();
        let parses_nonzero = parse_file_size(text).map(|s| s > 0).unwrap_or(false);
        if parses_nonzero && lowered != "0.00b" && !lowered.contains("item") && no_trailing_slash {
            return true;
        }
    }
    false
}

fn base64_decode_maybe(value: &str) -> Option<String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

fn decoded_last_segment(href: &str) -> String {
    let path_only = href.split('?').next().unwrap_or(href);
    let last = path_only.trim_end_matches('/').rsplit('/').next().unwrap_or(path_only);
    percent_encoding::percent_decode_str(last).decode_utf8().map(|c| c.into_owned()).unwrap_or_else(|_| last.to_string())
}

fn directory_name(href: &str, link_text: &str, has_name_class: bool) -> String {
    if let Some(v) = href_query_get(href, "folder") {
        return base64_decode_maybe(&v).unwrap_or(v);
    }
    if let Some(v) = href_query_get(href, "directory") {
        return v;
    }
    if let Some(v) = href_query_get(href, "dirname") {
        return v;
    }
    if let Some(v) = href_query_get(href, "dir") {
        return v;
    }
    if has_name_class && !link_text.trim().is_empty() {
        return link_text.trim().to_string();
    }
    decoded_last_segment(href)
}

fn file_name(href: &str, link_text: &str, has_name_class: bool) -> String {
    if let Some(v) = href_query_get(href, "file") {
        return v;
    }
    if let Some(v) = href_query_get(href, "url") {
        let path_only = v.split('?').next().unwrap_or(&v);
        let last = path_only.trim_end_matches('/').rsplit('/').next().unwrap_or(path_only);
        return percent_encoding::percent_decode_str(last)
            .decode_utf8()
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| last.to_string());
    }
    let decoded = decoded_last_segment(href);
    if decoded.is_empty() || has_name_class {
        if !link_text.trim().is_empty() {
            return link_text.trim().to_string();
        }
    }
    decoded
}

fn row_has_name_class(row: ElementRef<'_>) -> bool {
    element_has_class_containing(row, "name")
}

fn column_map_for(table: ElementRef<'_>) -> (ColumnMap, usize, bool) {
    if let Some(detected) = header::detect_header(table) {
        let map = header::build_column_map(&detected.cells);
        if !header::all_unknown(&map) {
            return (map, detected.cells.len(), detected.remove_first_row);
        }
    }
    // Heuristic fallback: scan data rows.
    let rows = header::direct_rows(table);
    let samples: Vec<Vec<CellSample>> = rows
        .iter()
        .map(|r| {
            cell_tags(*r)
                .into_iter()
                .map(|c| CellSample { text: cell_text(c), has_anchor: html_util::first_anchor(c).is_some(), has_img: has_img(c) })
                .collect()
        })
        .collect();
    (header::heuristic_column_map(&samples), 0, false)
}

/// Extract one table's rows into entries. Returns `None` if the table
/// yields no entries at all (so the dispatcher can try the next table).
fn extract_table(table: ElementRef<'_>, base_url: &str) -> Option<ExtractionOutcome> {
    let (map, header_count, remove_first_row) = column_map_for(table);
    let rows = header::direct_rows(table);
    let data_rows = if remove_first_row && !rows.is_empty() { &rows[1..] } else { &rows[..] };
    let has_size_header = map.column_for(HeaderType::FileSize).is_some();

    let mut entries = Vec::new();
    for row in data_rows {
        if html_util::is_inside_nested_table(*row, table) {
            continue;
        }
        let Some(anchor) = valid_anchor(*row) else { continue };
        if anchor.text.to_lowercase().contains("parent directory") {
            continue;
        }
        let Some(abs_url) = resolve(base_url, anchor.href) else { continue };

        let cells = cell_tags(*row);
        let size_text = map.column_for(HeaderType::FileSize).and_then(|idx| cells.get(idx.saturating_sub(1))).map(|c| cell_text(*c));
        let description = map
            .column_for(HeaderType::Description)
            .and_then(|idx| cells.get(idx.saturating_sub(1)))
            .map(|c| cell_text(*c))
            .filter(|s| !s.is_empty());
        let is_dir = is_directory_row(*row, anchor.href) || abs_url.ends_with('/');
        let has_name_class = row_has_name_class(*row) || anchor.el.value().attr("class").map(|c| c.contains("name")).unwrap_or(false);

        if is_dir {
            let name = directory_name(anchor.href, &anchor.text, has_name_class);
            entries.push(ExtractedEntry::directory(abs_url, name).with_description(description));
        } else if is_file_row(is_dir, anchor.href, size_text.as_deref(), has_size_header) {
            let name = file_name(anchor.href, &anchor.text, has_name_class);
            let size = size_text.as_deref().and_then(parse_file_size).unwrap_or(crate::types::UNKNOWN_SIZE);
            entries.push(ExtractedEntry::file(abs_url, name, size).with_description(description));
        }
    }

    if entries.is_empty() {
        None
    } else {
        Some(ExtractionOutcome::new(entries, header_count))
    }
}

fn top_level_tables(doc: &Html) -> Vec<ElementRef<'_>> {
    let sel = html_util::selector("table");
    doc.select(&sel).filter(|t| !ancestors(*t).any(|a| a.value().name() == "table")).collect()
}

/// Explicit directory/file split signal: a table whose directory rows
/// carry `?dir=` while another table holds the files (spec §4.6 "merge").
fn has_explicit_dir_query(table: ElementRef<'_>) -> bool {
    for row in header::direct_rows(table) {
        if let Some(anchor) = valid_anchor(row) {
            if href_query_get(anchor.href, "dir").is_some() {
                return true;
            }
        }
    }
    false
}

/// Run the generic table extractor over every top-level `<table>`, pick
/// the best single table by header-count then entry-count, or merge two
/// tables that are explicitly split directory/file listings.
pub fn extract(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let tables = top_level_tables(doc);
    let mut results: Vec<(ExtractionOutcome, bool)> = tables
        .into_iter()
        .filter_map(|t| extract_table(t, base_url).map(|r| (r, has_explicit_dir_query(t))))
        .collect();

    if results.is_empty() {
        return None;
    }
    if results.len() >= 2 && results.iter().filter(|(_, split)| *split).count() >= 1 {
        let mut merged = Vec::new();
        let mut header_count = 0;
        for (outcome, _) in &results {
            header_count = header_count.max(outcome.header_count);
        }
        for (outcome, _) in results {
            merged.extend(outcome.entries);
        }
        return Some(ExtractionOutcome::new(merged, header_count));
    }

    results.sort_by(|a, b| {
        b.0.header_count.cmp(&a.0.header_count).then(b.0.entries.len().cmp(&a.0.entries.len()))
    });
    Some(results.remove(0).0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn apache_style_table_extracts_dir_and_file() {
        let html = r#"
            <table>
              <tr><th>Name</th><th>Last modified</th><th>Size</th></tr>
              <tr><td><img alt="[DIR]"></td><td><a href="sub/">sub/</a></td><td>-</td></tr>
              <tr><td><img alt="[   ]"></td><td><a href="a.txt">a.txt</a></td><td>12K</td></tr>
            </table>
        "#;
        let outcome = extract(&doc(html), "http://h/p/").unwrap();
        assert_eq!(outcome.entries.len(), 2);
        let dir = outcome.entries.iter().find(|e| e.name == "sub").unwrap();
        assert_eq!(dir.url, "http://h/p/sub/");
        let file = outcome.entries.iter().find(|e| e.name == "a.txt").unwrap();
        assert_eq!(file.file_size, Some(12 * 1024));
    }

    #[test]
    fn parent_directory_row_is_skipped() {
        let html = r#"
            <table>
              <tr><td><a href="../">Parent Directory</a></td></tr>
              <tr><td><a href="a.txt">a.txt</a></td></tr>
            </table>
        "#;
        let outcome = extract(&doc(html), "http://h/p/").unwrap();
        assert_eq!(outcome.entries.len(), 1);
    }

    #[test]
    fn folder_query_param_name_is_base64_decoded() {
        let encoded = {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode("My Folder")
        };
        let html = format!(r#"<table><tr><td><a href="list.php?folder={encoded}">x</a></td></tr></table>"#);
        let outcome = extract(&doc(&html), "http://h/p/").unwrap();
        assert_eq!(outcome.entries[0].name, "My Folder");
    }

    #[test]
    fn description_column_is_attached_to_entries() {
        let html = r#"
            <table>
              <tr><th>Name</th><th>Size</th><th>Description</th></tr>
              <tr><td><a href="a.txt">a.txt</a></td><td>10</td><td>a note</td></tr>
            </table>
        "#;
        let outcome = extract(&doc(html), "http://h/p/").unwrap();
        assert_eq!(outcome.entries[0].description, Some("a note".to_string()));
    }

    #[test]
    fn picks_table_with_more_named_headers() {
        let html = r#"
            <table><tr><td><a href="noise/">noise</a></td></tr></table>
            <table>
              <tr><th>Name</th><th>Size</th></tr>
              <tr><td><a href="a.txt">a.txt</a></td><td>10</td></tr>
            </table>
        "#;
        let outcome = extract(&doc(html), "http://h/p/").unwrap();
        assert!(outcome.entries.iter().any(|e| e.name == "a.txt"));
    }
}
