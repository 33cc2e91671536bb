//! Small DOM helpers shared by every extractor, built on `scraper`.

use crate::link_validator::is_valid_entry_link;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid built-in selector: {css}"))
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| selector("a"))
}

fn img_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| selector("img"))
}

/// Trimmed, whitespace-joined text content of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join("").trim().to_string()
}

/// First `<a>` descendant of `el`, if any.
pub fn first_anchor<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.select(anchor_selector()).next()
}

/// Whether `el` contains an `<img>` anywhere in its subtree.
pub fn has_img(el: ElementRef<'_>) -> bool {
    el.select(img_selector()).next().is_some()
}

/// `alt` attribute of the first `<img>` descendant, if any.
pub fn img_alt<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    el.select(img_selector()).next().and_then(|img| img.value().attr("alt"))
}

/// `src` attribute of the first `<img>` descendant, if any.
pub fn img_src<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    el.select(img_selector()).next().and_then(|img| img.value().attr("src"))
}

/// A validated anchor: href, visible text, resolved absolute URL.
pub struct Anchor<'a> {
    pub el: ElementRef<'a>,
    pub href: &'a str,
    pub text: String,
}

/// Find the first `<a>` inside `el` that passes the link validator (C2).
pub fn valid_anchor(el: ElementRef<'_>) -> Option<Anchor<'_>> {
    let a = first_anchor(el)?;
    let href = a.value().attr("href")?;
    let text = text_of(a);
    let title = a.value().attr("title");
    if !is_valid_entry_link(href, &text, title) {
        return None;
    }
    Some(Anchor { el: a, href, text })
}

/// Number of direct element children of `el` (text nodes don't count).
pub fn element_child_count(el: ElementRef<'_>) -> usize {
    el.children().filter_map(ElementRef::wrap).count()
}

/// Ancestors of `el`, nearest first.
pub fn ancestors<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    std::iter::successors(el.parent().and_then(ElementRef::wrap), |e| e.parent().and_then(ElementRef::wrap))
}

/// Does `el` sit inside a `<table>` other than `table` itself, i.e. a
/// nested table? Used by the generic table extractor (4.6) to reject rows
/// belonging to an inner table.
pub fn is_inside_nested_table(el: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    for ancestor in ancestors(el) {
        if ancestor == table {
            return false;
        }
        if ancestor.value().name() == "table" {
            return true;
        }
    }
    false
}
