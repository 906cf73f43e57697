//! HTML scraping for listing pages and article pages.
//!
//! The work is split the same way for every source:
//!
//! 1. **Harvesting** ([`links`]): collect `(text, href)` pairs from a listing page
//! 2. **Extraction** ([`article`]): fetch one article and recover its headline and body
//!
//! Both operate on already-fetched HTML and never fail: a missing document
//! yields no links, an unreadable article yields a sentinel.

pub mod article;
pub mod links;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Visible text of an element with runs of whitespace collapsed to one space.
///
/// Used for anchor text and headlines, where line structure carries no meaning.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let raw = element.text().collect::<String>();
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Trimmed text of a body paragraph.
///
/// Source formatting inside text nodes is collapsed, but every `<br>` becomes
/// a line break so verse, addresses and sign-offs keep their shape.
pub(crate) fn paragraph_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(&WHITESPACE.replace_all(text, " ")),
            Node::Element(el) if el.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }
    raw.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
