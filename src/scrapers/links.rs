//! Listing-page link harvesting.

use super::element_text;
use crate::models::CandidateLink;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info};

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Collect every anchor with an `href` from a listing page, in document order.
///
/// No filtering or deduplication happens here. A missing document (the
/// listing fetch failed) yields an empty list.
pub fn harvest_links(document: Option<&Html>) -> Vec<CandidateLink> {
    let Some(document) = document else {
        debug!("No listing document; nothing to harvest");
        return Vec::new();
    };

    let links: Vec<CandidateLink> = document
        .select(&ANCHOR)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(CandidateLink {
                text: element_text(element),
                href: href.to_string(),
            })
        })
        .collect();

    info!(count = links.len(), "Harvested listing links");
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_in_document_order_with_duplicates() {
        let html = Html::parse_document(
            r#"<html><body>
            <nav><a href="/login">Login</a></nav>
            <div class="card"><a href="/opinion/column/first-article">  First
                 headline </a></div>
            <a>no href</a>
            <a href="/opinion/column/first-article">First headline</a>
            <a href="">empty</a>
            <a href="https://facebook.com/share">Share</a>
            </body></html>"#,
        );

        let links = harvest_links(Some(&html));
        let hrefs: Vec<&str> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "/login",
                "/opinion/column/first-article",
                "/opinion/column/first-article",
                "https://facebook.com/share",
            ]
        );
        assert_eq!(links[1].text, "First headline");
    }

    #[test]
    fn test_harvest_without_document_is_empty() {
        assert!(harvest_links(None).is_empty());
    }

    #[test]
    fn test_harvest_garbage_document_is_empty() {
        let html = Html::parse_document("\u{0}<<<>>> not html at all");
        assert!(harvest_links(Some(&html)).is_empty());
    }
}
