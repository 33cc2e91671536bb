//! Header classifier (C3): locate a table's header row (or determine there
//! isn't one) and assign each column a semantic role, with a heuristic
//! fallback that scans data rows when every header token is Unknown.

use crate::dateparse::looks_like_date;
use crate::types::{ColumnMap, HeaderInfo, HeaderType};
use crate::url_utils::parse_file_size_only_checking;
use scraper::ElementRef;

// ---------------------------------------------------------------------------
// DOM helpers (direct-children only, so a nested table's rows are never
// mistaken for this table's own rows)
// ---------------------------------------------------------------------------

pub fn element_children(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap)
}

pub fn direct_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in element_children(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "tbody" | "thead" | "tfoot" => {
                for grandchild in element_children(child) {
                    if grandchild.value().name() == "tr" {
                        rows.push(grandchild);
                    }
                }
            }
            _ => {}
        }
    }
    rows
}

fn row_cells<'a>(row: ElementRef<'a>, tags: &[&str]) -> Vec<ElementRef<'a>> {
    element_children(row).filter(|c| tags.contains(&c.value().name())).collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join("").trim().to_string()
}

fn cell_colspan(cell: ElementRef<'_>) -> usize {
    cell.value().attr("colspan").and_then(|s| s.parse::<usize>().ok()).filter(|n| *n > 0).unwrap_or(1)
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().attr("class").map(|c| c.split_whitespace().any(|cl| cl == class)).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Header row detection cascade
// ---------------------------------------------------------------------------

pub struct DetectedHeader {
    /// (text, colspan) for each header cell, in column order.
    pub cells: Vec<(String, usize)>,
    /// Whether the row used as the header must be excluded from data rows.
    pub remove_first_row: bool,
}

fn extract(cells: &[ElementRef<'_>]) -> Vec<(String, usize)> {
    cells.iter().map(|c| (cell_text(*c), cell_colspan(*c))).collect()
}

/// Find the header row for a table, trying each detection method in order.
pub fn detect_header(table: ElementRef<'_>) -> Option<DetectedHeader> {
    let rows = direct_rows(table);
    if rows.is_empty() {
        return None;
    }

    // (1) a row with <th> cells, unless the first cell carries a colspan
    // (title bar masquerading as a header).
    if let Some(row) = rows.iter().find(|r| !row_cells(**r, &["th"]).is_empty()) {
        let th_cells = row_cells(*row, &["th"]);
        let first_has_colspan = th_cells.first().map(|c| c.value().attr("colspan").is_some()).unwrap_or(false);
        if !first_has_colspan {
            return Some(DetectedHeader { cells: extract(&th_cells), remove_first_row: false });
        }
    }

    // (2) Snif-style `.snHeading` row.
    if let Some(row) = rows.iter().find(|r| has_class(**r, "snHeading")) {
        let cells = row_cells(*row, &["td", "th"]);
        if !cells.is_empty() {
            return Some(DetectedHeader { cells: extract(&cells), remove_first_row: false });
        }
    }

    // (3) `thead td|th`.
    if let Some(thead) = element_children(table).find(|c| c.value().name() == "thead") {
        if let Some(row) = element_children(thead).find(|c| c.value().name() == "tr") {
            let cells = row_cells(row, &["td", "th"]);
            if !cells.is_empty() {
                return Some(DetectedHeader { cells: extract(&cells), remove_first_row: false });
            }
        }
    }

    let first_row = rows[0];

    // (4) first-row `th`.
    let th_cells = row_cells(first_row, &["th"]);
    if !th_cells.is_empty() {
        return Some(DetectedHeader { cells: extract(&th_cells), remove_first_row: false });
    }

    // (5) first-row `td`, flagged for removal from data rows.
    let td_cells = row_cells(first_row, &["td"]);
    if !td_cells.is_empty() {
        return Some(DetectedHeader { cells: extract(&td_cells), remove_first_row: true });
    }

    None
}

// ---------------------------------------------------------------------------
// Keyword classification (data, not code — locales can be extended here)
// ---------------------------------------------------------------------------

const MODIFIED_TOKENS: &[&str] =
    &["lastmodified", "modified", "date", "lastmodification", "time", "修改时间", "修改日期", "最終更新"];
const SIZE_TOKENS: &[&str] = &["size", "filesize", "taille", "大小", "サイズ"];
const NAME_TOKENS: &[&str] = &["file", "name", "filename", "directory", "link", "nom", "文件", "ファイル名"];

fn tokenize(text: &str) -> String {
    text.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Classify one header cell's text into a semantic role. Declarative
/// keyword table; first match wins, FileName evaluated last so it doesn't
/// eat "file size".
pub fn classify_header_text(text: &str) -> HeaderType {
    let token = tokenize(text);
    if token.is_empty() {
        return HeaderType::Unknown;
    }
    if MODIFIED_TOKENS.iter().any(|k| token.contains(k)) {
        return HeaderType::Modified;
    }
    if token == "type" {
        return HeaderType::Type;
    }
    if SIZE_TOKENS.iter().any(|k| token.contains(k)) {
        return HeaderType::FileSize;
    }
    if token == "description" {
        return HeaderType::Description;
    }
    if NAME_TOKENS.iter().any(|k| token.contains(k)) {
        return HeaderType::FileName;
    }
    HeaderType::Unknown
}

/// Build a [`ColumnMap`] from detected header cells, advancing the column
/// counter by each cell's colspan.
pub fn build_column_map(cells: &[(String, usize)]) -> ColumnMap {
    let mut map = ColumnMap::default();
    let mut col = 1usize;
    for (text, colspan) in cells {
        let kind = classify_header_text(text);
        let span = (*colspan).max(1);
        for offset in 0..span {
            map.columns.insert(col + offset, HeaderInfo { header: text.clone(), kind });
        }
        col += span;
    }
    map
}

/// True when every classified header cell is `Unknown` (or there were no
/// header cells at all) — triggers the heuristic fallback.
pub fn all_unknown(map: &ColumnMap) -> bool {
    map.columns.values().all(|h| h.kind == HeaderType::Unknown)
}

// ---------------------------------------------------------------------------
// Heuristic fallback (scans data rows when headers are absent/unlabeled)
// ---------------------------------------------------------------------------

/// One data-row cell, as seen by the heuristic scanner.
pub struct CellSample {
    pub text: String,
    pub has_anchor: bool,
    pub has_img: bool,
}

/// Tally per-column occurrences across all data rows and assign each role
/// to the column whose average position rounds to a valid index. Ties are
/// broken by priority (FileName, then Modified, FileSize, Type) and, within
/// a role, by first encounter.
pub fn heuristic_column_map(rows: &[Vec<CellSample>]) -> ColumnMap {
    let mut name_positions = Vec::new();
    let mut modified_positions = Vec::new();
    let mut size_positions = Vec::new();
    let mut type_positions = Vec::new();

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let col = idx + 1;
            if cell.has_anchor {
                name_positions.push(col);
            }
            if looks_like_date(&cell.text) {
                modified_positions.push(col);
            }
            if parse_file_size_only_checking(&cell.text) != 0 {
                size_positions.push(col);
            }
            if cell.has_img {
                type_positions.push(col);
            }
        }
    }

    let mut map = ColumnMap::default();
    if let Some(col) = average_round(&name_positions) {
        map.columns.entry(col).or_insert(HeaderInfo { header: String::new(), kind: HeaderType::FileName });
    }
    if let Some(col) = average_round(&modified_positions) {
        map.columns.entry(col).or_insert(HeaderInfo { header: String::new(), kind: HeaderType::Modified });
    }
    if let Some(col) = average_round(&size_positions) {
        map.columns.entry(col).or_insert(HeaderInfo { header: String::new(), kind: HeaderType::FileSize });
    }
    if let Some(col) = average_round(&type_positions) {
        map.columns.entry(col).or_insert(HeaderInfo { header: String::new(), kind: HeaderType::Type });
    }
    map
}

fn average_round(positions: &[usize]) -> Option<usize> {
    if positions.is_empty() {
        return None;
    }
    let sum: usize = positions.iter().sum();
    let avg = sum as f64 / positions.len() as f64;
    let rounded = avg.round() as usize;
    if rounded == 0 {
        positions.first().copied()
    } else {
        Some(rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_english_headers() {
        assert_eq!(classify_header_text("Name"), HeaderType::FileName);
        assert_eq!(classify_header_text("Last modified"), HeaderType::Modified);
        assert_eq!(classify_header_text("Size"), HeaderType::FileSize);
        assert_eq!(classify_header_text("Description"), HeaderType::Description);
        assert_eq!(classify_header_text("Type"), HeaderType::Type);
    }

    #[test]
    fn file_size_does_not_get_eaten_by_filename() {
        assert_eq!(classify_header_text("File Size"), HeaderType::FileSize);
    }

    #[test]
    fn classifies_localized_headers() {
        assert_eq!(classify_header_text("大小"), HeaderType::FileSize);
        assert_eq!(classify_header_text("ファイル名"), HeaderType::FileName);
        assert_eq!(classify_header_text("修改时间"), HeaderType::Modified);
    }

    #[test]
    fn unknown_for_unrecognized_header() {
        assert_eq!(classify_header_text("Foo"), HeaderType::Unknown);
    }

    #[test]
    fn column_map_advances_by_colspan() {
        let cells = vec![("Name".to_string(), 2usize), ("Size".to_string(), 1usize)];
        let map = build_column_map(&cells);
        assert_eq!(map.kind_at(1), HeaderType::FileName);
        assert_eq!(map.kind_at(2), HeaderType::FileName);
        assert_eq!(map.kind_at(3), HeaderType::FileSize);
    }

    #[test]
    fn heuristic_picks_majority_column_per_role() {
        let rows = vec![
            vec![
                CellSample { text: "a.txt".into(), has_anchor: true, has_img: false },
                CellSample { text: "12K".into(), has_anchor: false, has_img: false },
            ],
            vec![
                CellSample { text: "b.txt".into(), has_anchor: true, has_img: false },
                CellSample { text: "1K".into(), has_anchor: false, has_img: false },
            ],
        ];
        let map = heuristic_column_map(&rows);
        assert_eq!(map.column_for(HeaderType::FileName), Some(1));
        assert_eq!(map.column_for(HeaderType::FileSize), Some(2));
    }
}
