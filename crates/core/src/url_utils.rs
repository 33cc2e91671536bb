//! URL and size utilities (C1): relative-URL resolution, Apache sort-query
//! stripping, human file-size parsing, and default-filename erasure.

use crate::types::UNKNOWN_SIZE;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Resolve `href` (relative, absolute, scheme-less, or query-only) against
/// `base` into an absolute URL.
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let base_url = Url::parse(base).ok()?;
    base_url.join(href).ok().map(|u| u.to_string())
}

/// Remove a classic Apache `?C=<col>&O=<dir>` sort-query pair, leaving
/// everything else untouched. Idempotent.
pub fn strip_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let pairs: Vec<(String, String)> =
        parsed.query_pairs().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    if pairs.len() == 2 && pairs.iter().any(|(k, _)| k == "C") && pairs.iter().any(|(k, _)| k == "O")
    {
        let mut stripped = parsed.clone();
        stripped.set_query(None);
        stripped.to_string()
    } else {
        url.to_string()
    }
}

/// Erase a handful of default index filenames from a URL path so two URLs
/// differing only by the default filename compare equal. Idempotent. The
/// filename list is policy, not code — see `ParserConfig::default_filenames`
/// (DESIGN.md open question (b)).
pub fn replace_common_default_filenames(path: &str, default_filenames: &[String]) -> String {
    let (dir, last) = match path.rsplit_once('/') {
        Some((d, l)) => (d, l),
        None => return path.to_string(),
    };
    if default_filenames.iter().any(|f| f.eq_ignore_ascii_case(last)) {
        format!("{dir}/")
    } else {
        path.to_string()
    }
}

fn size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(-?[0-9.,]+)\s*([A-Za-z]*)$").unwrap())
}

/// Parse a human file-size string (`"1.2 GB"`, `"3kB"`, `"42"`, ...) into a
/// byte count. Returns `None` when the text is not a size at all (`"-"`,
/// em-dash, `"<Directory>"`, `"0.00b"`). A raw value that works out negative
/// (32-bit wrap artifact) collapses to [`UNKNOWN_SIZE`] rather than `None`,
/// since the row is still a legitimate "size unknown" entry.
pub fn parse_file_size(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if matches!(lowered.as_str(), "-" | "—" | "<directory>" | "0.00b" | "0.00 b") {
        return None;
    }

    let caps = size_regex().captures(trimmed)?;
    let number = normalize_number(&caps[1])?;
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_lowercase();
    let multiplier = unit_multiplier(&unit)?;

    let bytes = number * multiplier;
    if bytes < 0.0 {
        Some(UNKNOWN_SIZE)
    } else {
        Some(bytes.round() as i64)
    }
}

/// Guard-mode variant used by the heuristic header classifier: never
/// throws/propagates on non-size input, just reports `0`.
pub fn parse_file_size_only_checking(text: &str) -> i64 {
    parse_file_size(text).unwrap_or(0)
}

fn unit_multiplier(unit: &str) -> Option<f64> {
    Some(match unit {
        "" | "b" | "byte" | "bytes" => 1.0,
        "k" | "kb" | "kib" => 1024.0,
        "m" | "mb" | "mib" => 1024.0 * 1024.0,
        "g" | "gb" | "gib" => 1024.0 * 1024.0 * 1024.0,
        "t" | "tb" | "tib" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "p" | "pb" | "pib" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    })
}

/// Normalize a localized numeric string (comma or dot as decimal/thousands
/// separator) into an `f64`.
fn normalize_number(raw: &str) -> Option<f64> {
    let has_comma = raw.contains(',');
    let has_dot = raw.contains('.');
    let cleaned = if has_comma && has_dot {
        let last_comma = raw.rfind(',').unwrap();
        let last_dot = raw.rfind('.').unwrap();
        if last_comma > last_dot {
            raw.replace('.', "").replace(',', ".")
        } else {
            raw.replace(',', "")
        }
    } else if has_comma {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_against_directory_base() {
        assert_eq!(resolve("http://h/p/", "sub/"), Some("http://h/p/sub/".to_string()));
        assert_eq!(resolve("http://h/p/", "a.txt"), Some("http://h/p/a.txt".to_string()));
    }

    #[test]
    fn resolve_absolute_and_scheme_less() {
        assert_eq!(resolve("http://h/p/", "http://other/x"), Some("http://other/x".to_string()));
    }

    #[test]
    fn strip_url_removes_apache_sort_pair() {
        assert_eq!(strip_url("http://h/p/?C=N;O=A"), "http://h/p/");
        assert_eq!(strip_url("http://h/p/?C=N&O=A"), "http://h/p/");
    }

    #[test]
    fn strip_url_leaves_other_queries_alone() {
        assert_eq!(strip_url("http://h/p/?file=a.txt"), "http://h/p/?file=a.txt");
    }

    #[test]
    fn strip_url_is_idempotent() {
        let once = strip_url("http://h/p/?C=N;O=A");
        assert_eq!(strip_url(&once), once);
    }

    #[test]
    fn replace_default_filenames_is_idempotent() {
        let names = crate::config::ParserConfig::default().default_filenames;
        let once = replace_common_default_filenames("/a/index.php", &names);
        assert_eq!(once, "/a/");
        assert_eq!(replace_common_default_filenames(&once, &names), once);
    }

    #[test]
    fn parse_file_size_plain_bytes() {
        assert_eq!(parse_file_size("42"), Some(42));
    }

    #[test]
    fn parse_file_size_units() {
        assert_eq!(parse_file_size("3kB"), Some(3 * 1024));
        assert_eq!(parse_file_size("1.2 GB"), Some((1.2 * 1024.0 * 1024.0 * 1024.0).round() as i64));
    }

    #[test]
    fn parse_file_size_rejects_placeholders() {
        assert_eq!(parse_file_size("-"), None);
        assert_eq!(parse_file_size("—"), None);
        assert_eq!(parse_file_size("<Directory>"), None);
        assert_eq!(parse_file_size("0.00b"), None);
    }

    #[test]
    fn parse_file_size_only_checking_never_panics_on_garbage() {
        assert_eq!(parse_file_size_only_checking("not a size"), 0);
    }

    #[test]
    fn parse_file_size_negative_wrap_collapses_to_unknown() {
        assert_eq!(parse_file_size("-4096"), Some(UNKNOWN_SIZE));
    }
}
