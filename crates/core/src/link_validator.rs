//! Link validator (C2): classify an anchor as a navigable entry or a
//! decorative/parent/sort/mailto/js link to be ignored.

use regex::Regex;
use std::sync::OnceLock;

fn sort_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\?[nmsd]=\??[ad]").unwrap())
}

/// Decide whether an anchor is a real directory-listing entry.
///
/// `href` is the raw (unresolved) attribute value, `text` the anchor's
/// trimmed visible text, `title` its optional `title` attribute.
pub fn is_valid_entry_link(href: &str, text: &str, title: Option<&str>) -> bool {
    let href = href.trim();
    if href.is_empty() {
        return false;
    }
    if matches!(href, "/" | ".." | "../" | "./." | "./.." | "#") {
        return false;
    }

    let href_lower = href.to_lowercase();
    if href_lower.starts_with("javascript:") || href_lower.starts_with("mailto:") {
        return false;
    }
    if href_lower.contains("&expand") {
        return false;
    }

    let text = text.trim();
    if matches!(text, ".." | ".") || text == "Name" {
        return false;
    }
    if text.eq_ignore_ascii_case("parent directory") || text.eq_ignore_ascii_case("[to parent directory]") {
        return false;
    }

    if let Some(t) = title {
        if t.trim() == ".." {
            return false;
        }
    }

    let final_segment = href.rsplit('/').next().unwrap_or(href);
    let final_segment_no_query = final_segment.split('?').next().unwrap_or(final_segment);
    let is_directory_list_asp = final_segment_no_query.eq_ignore_ascii_case("DirectoryList.asp");

    if sort_link_re().is_match(href) && !is_directory_list_asp {
        return false;
    }

    if is_directory_list_asp && text.is_empty() {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_entries() {
        assert!(is_valid_entry_link("sub/", "sub/", None));
        assert!(is_valid_entry_link("a.txt", "a.txt", None));
    }

    #[test]
    fn rejects_empty_and_degenerate_hrefs() {
        for href in ["", "/", "..", "../", "./.", "./..", "#"] {
            assert!(!is_valid_entry_link(href, "whatever", None), "should reject {href}");
        }
    }

    #[test]
    fn rejects_js_and_mailto() {
        assert!(!is_valid_entry_link("JavaScript:void(0)", "x", None));
        assert!(!is_valid_entry_link("mailto:a@b.com", "x", None));
    }

    #[test]
    fn rejects_parent_directory_text_variants() {
        assert!(!is_valid_entry_link("../", "Parent Directory", None));
        assert!(!is_valid_entry_link("../", "[To Parent Directory]", None));
        assert!(!is_valid_entry_link("x", "..", None));
        assert!(!is_valid_entry_link("x", ".", None));
        assert!(!is_valid_entry_link("x", "Name", None));
    }

    #[test]
    fn rejects_title_dotdot() {
        assert!(!is_valid_entry_link("x", "link text", Some("..")));
    }

    #[test]
    fn rejects_sort_links_unless_directorylist_asp() {
        assert!(!is_valid_entry_link("?N=A", "Name", None));
        assert!(!is_valid_entry_link("?S=D", "Size", None));
        assert!(is_valid_entry_link("DirectoryList.asp?N=A", "Files", None));
    }

    #[test]
    fn rejects_directorylist_asp_with_empty_text() {
        assert!(!is_valid_entry_link("DirectoryList.asp", "", None));
        assert!(is_valid_entry_link("DirectoryList.asp", "browse", None));
    }

    #[test]
    fn rejects_expand_links() {
        assert!(!is_valid_entry_link("?dir=foo&expand=1", "foo", None));
    }
}
