//! Shared "does this look like a modified-date" detector, used by the
//! header classifier's heuristic fallback (C3) and indirectly by the
//! preformatted-text regex family (C4/4.5), which encodes its own exact
//! per-dialect date shapes but relies on this for the loose data-row scan.

use regex::Regex;
use std::sync::OnceLock;

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // Apache: 01-Jan-2020 10:00
            Regex::new(r"\d{1,2}-[A-Za-z]{3}-\d{4}\s+\d{1,2}:\d{2}").unwrap(),
            // ISO-ish: 2020-01-01 10:00 or 2020-01-01T10:00
            Regex::new(r"\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}").unwrap(),
            // US slash with optional AM/PM: 1/1/2020 10:00 AM
            Regex::new(r"(?i)\d{1,2}/\d{1,2}/\d{4}\s+\d{1,2}:\d{2}(\s*(am|pm))?").unwrap(),
            // IIS long form: Wednesday, January 1, 2020 10:00 AM
            Regex::new(
                r"(?i)(monday|tuesday|wednesday|thursday|friday|saturday|sunday),\s+[A-Za-z]+\s+\d{1,2},\s+\d{4}\s+\d{1,2}:\d{2}\s*(am|pm)",
            )
            .unwrap(),
            // Korean IIS: 2020-01-01 오전 10:00
            Regex::new(r"\d{4}-\d{2}-\d{2}\s+(오전|오후)\s+\d{1,2}:\d{2}").unwrap(),
        ]
    })
}

/// Loose structural check: does this text contain something shaped like a
/// modified-date/time stamp? Used only for heuristic column scoring, never
/// for the ordered preformatted-text regex parsers (those match full lines).
pub fn looks_like_date(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    date_patterns().iter().any(|re| re.is_match(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_apache_style() {
        assert!(looks_like_date("01-Jan-2020 10:00"));
    }

    #[test]
    fn recognizes_iso_style() {
        assert!(looks_like_date("2020-01-01 10:00"));
    }

    #[test]
    fn recognizes_us_slash_style() {
        assert!(looks_like_date("1/2/2020 10:00 AM"));
    }

    #[test]
    fn rejects_non_dates() {
        assert!(!looks_like_date("a.txt"));
        assert!(!looks_like_date("12K"));
    }
}
