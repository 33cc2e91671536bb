//! Preformatted-text extractor (C4/§4.5) — `<pre>` blocks rendered by
//! lighttpd/IIS-classic/ad-hoc "ls -l"-style listings. Each block is split
//! into lines; each line runs through eight ordered regex parsers, first
//! match wins. The ordering is the contract — never fuse these into one
//! pattern (spec §9 design notes).

use crate::extract::{ExtractedEntry, ExtractionOutcome};
use crate::html_util;
use crate::link_validator::is_valid_entry_link;
use crate::types::UNKNOWN_SIZE;
use crate::url_utils::{parse_file_size, resolve};
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

fn line_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\r\n|\r|\n|<br\s*/?>|<hr\s*/?>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[^>]+>").unwrap())
}

fn apache_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}-[A-Za-z]{3}-\d{4}\s+\d{1,2}:\d{2}").unwrap())
}

fn iis_weekday_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(monday|tuesday|wednesday|thursday|friday|saturday|sunday),\s+[A-Za-z]+\s+\d{1,2},\s+\d{4}\s+\d{1,2}:\d{2}\s*(am|pm)",
        )
        .unwrap()
    })
}

fn korean_iis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}\s+(오전|오후)\s+\d{1,2}:\d{2}").unwrap())
}

fn us_slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d{1,2}/\d{1,2}/\d{4}\s+\d{1,2}:\d{2}\s*(am|pm)").unwrap())
}

fn ls_permissions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([d-])[rwx-]{9}\S*\s+\S+\s+\S+\s+\S+\s+(-?\d+)").unwrap())
}

fn strip_tags(line: &str) -> String {
    tag_re().replace_all(line, " ").to_string()
}

fn has_dir_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<dir>") || lower.split_whitespace().any(|t| t == "dir")
}

struct LineAnchor {
    href: String,
    text: String,
}

fn extract_anchor(line: &str) -> Option<LineAnchor> {
    let sel = html_util::selector("a");
    let frag = Html::parse_fragment(line);
    let a = frag.select(&sel).next()?;
    let href = a.value().attr("href")?.to_string();
    let text = html_util::text_of(a);
    let title = a.value().attr("title");
    if !is_valid_entry_link(&href, &text, title) {
        return None;
    }
    Some(LineAnchor { href, text })
}

fn has_img_tag(line: &str) -> bool {
    let sel = html_util::selector("img");
    Html::parse_fragment(line).select(&sel).next().is_some()
}

/// Apply the eight ordered regex parsers to one stripped-of-tags line; the
/// anchor has already been validated by the caller. Returns
/// `Some((is_directory, size, description))`.
fn classify(plain_text: &str, has_img: bool) -> Option<(bool, i64, Option<String>)> {
    // R1: Apache-classic — <img> <a> modified size description.
    if has_img && apache_date_re().is_match(plain_text) {
        let date_end = apache_date_re().find(plain_text).map(|m| m.end()).unwrap_or(0);
        if has_dir_marker(plain_text) {
            return Some((true, UNKNOWN_SIZE, None));
        }
        if let Some(size) = find_size_token(plain_text) {
            return Some((false, size, trailing_description(plain_text, date_end)));
        }
    }

    // R2: compact `<a> datetime size`, no image, numeric/human size.
    if !has_img && apache_date_re().is_match(plain_text) {
        if let Some(size) = find_size_token(plain_text) {
            return Some((false, size, None));
        }
    }

    // R3: `date <img?> size <a>` — literal dir marker.
    if apache_date_re().is_match(plain_text) && has_dir_marker(plain_text) {
        return Some((true, UNKNOWN_SIZE, None));
    }

    // R4: IIS long weekday form.
    if iis_weekday_re().is_match(plain_text) {
        if has_dir_marker(plain_text) {
            return Some((true, UNKNOWN_SIZE, None));
        }
        if let Some(size) = find_size_token(plain_text) {
            return Some((false, size, None));
        }
    }

    // R5: Korean IIS.
    if korean_iis_re().is_match(plain_text) {
        if has_dir_marker(plain_text) {
            return Some((true, UNKNOWN_SIZE, None));
        }
        if let Some(size) = find_size_token(plain_text) {
            return Some((false, size, None));
        }
    }

    // R6: US slash date.
    if us_slash_re().is_match(plain_text) {
        if has_dir_marker(plain_text) {
            return Some((true, UNKNOWN_SIZE, None));
        }
        if let Some(size) = find_size_token(plain_text) {
            return Some((false, size, None));
        }
    }

    // R7: Unix `ls -l`.
    if let Some(caps) = ls_permissions_re().captures(plain_text) {
        let is_dir = &caps[1] == "d";
        let raw: i64 = caps[2].parse().unwrap_or(0);
        let size = if raw < 0 { UNKNOWN_SIZE } else { raw };
        return Some((is_dir, if is_dir { UNKNOWN_SIZE } else { size }, None));
    }

    None
}

/// Whatever text follows the modified-date and size tokens on an R1 line,
/// trimmed; `None` when nothing remains.
fn trailing_description(plain_text: &str, after_date: usize) -> Option<String> {
    let rest = plain_text.get(after_date..)?.trim_start();
    let mut tokens = rest.split_whitespace();
    tokens.next()?; // the size token already consumed by `find_size_token`
    let desc = tokens.collect::<Vec<_>>().join(" ");
    if desc.is_empty() {
        None
    } else {
        Some(desc)
    }
}

/// Last-resort token scan for a `1.2 GB`/`42`/`-` style size anywhere in
/// the line (used by R1/R2/R4-R6 and as R8's fallback).
fn find_size_token(text: &str) -> Option<i64> {
    text.split_whitespace().find_map(parse_file_size)
}

fn fallback_r8(href: &str, plain_text: &str) -> (bool, i64) {
    if href.ends_with('/') {
        return (true, UNKNOWN_SIZE);
    }
    let trailing = plain_text.split_whitespace().last().unwrap_or("");
    if trailing == "-" {
        return (false, UNKNOWN_SIZE);
    }
    let size = find_size_token(plain_text).unwrap_or(UNKNOWN_SIZE);
    (false, size)
}

fn parse_line(line: &str, base_url: &str) -> Option<ExtractedEntry> {
    let anchor = extract_anchor(line)?;
    if anchor.text.to_lowercase().contains("parent directory") {
        return None;
    }
    let plain_text = strip_tags(line);
    let has_img = has_img_tag(line);

    let (is_dir, size, description) = classify(&plain_text, has_img)
        .unwrap_or_else(|| { let (d, s) = fallback_r8(&anchor.href, &plain_text); (d, s, None) });
    let abs_url = resolve(base_url, &anchor.href)?;
    let name = if anchor.text.is_empty() {
        abs_url.trim_end_matches('/').rsplit('/').next().unwrap_or("").to_string()
    } else {
        anchor.text.trim_end_matches('/').to_string()
    };

    Some(if is_dir {
        ExtractedEntry::directory(abs_url, name).with_description(description)
    } else {
        ExtractedEntry::file(abs_url, name, size).with_description(description)
    })
}

pub fn extract(doc: &Html, base_url: &str) -> Option<ExtractionOutcome> {
    let pre_sel = html_util::selector("pre");
    let mut entries = Vec::new();
    for pre in doc.select(&pre_sel) {
        let inner = pre.inner_html();
        for line in line_split_re().split(&inner) {
            if let Some(entry) = parse_line(line, base_url) {
                entries.push(entry);
            }
        }
    }
    if entries.is_empty() {
        None
    } else {
        Some(ExtractionOutcome::new(entries, 0))
    }
}
