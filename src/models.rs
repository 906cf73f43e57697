//! Data models flowing through the digest pipeline.
//!
//! - [`Source`]: a configured listing page to harvest
//! - [`CandidateLink`]: an anchor found on a listing page, before filtering
//! - [`Article`]: an extracted article, labelled with the source that surfaced it
//! - [`SourceReport`]: per-source counters used for the diagnostic digest
//! - [`Digest`]: the ordered result of one run

use serde::{Deserialize, Serialize};
use url::Url;

/// A listing page to harvest, as read from the run configuration.
///
/// Sources are immutable for the duration of a run and processed in
/// configuration order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Source {
    /// Label shown next to every article this source contributes.
    pub name: String,
    /// The listing page URL.
    pub url: String,
    /// Maximum number of articles to accept from this source.
    pub target_count: usize,
    /// Substring a link must contain to count as a section article, e.g. `/opinion/`.
    pub section_marker: String,
    /// Base used to absolutize relative links. Defaults to the origin of `url`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Source {
    /// The site base that relative hrefs are resolved against.
    ///
    /// Uses the explicit `base_url` when configured, otherwise the scheme and
    /// host of the listing URL (`https://www.example.com/opinion` ->
    /// `https://www.example.com`).
    pub fn site_base(&self) -> String {
        if let Some(base) = &self.base_url {
            return base.clone();
        }
        match Url::parse(&self.url) {
            Ok(parsed) => parsed.origin().ascii_serialization(),
            Err(_) => self.url.clone(),
        }
    }
}

/// An anchor harvested from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateLink {
    /// Visible anchor text, whitespace collapsed.
    pub text: String,
    /// The raw `href` attribute, possibly relative.
    pub href: String,
}

/// An article accepted into the digest.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    /// Name of the source that surfaced the article.
    pub section: String,
    pub title: String,
    /// Absolute article URL.
    pub url: String,
    /// Extracted body text, paragraphs separated by a blank line.
    pub body: String,
}

/// What happened while processing one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub listing_url: String,
    /// Whether the listing page itself could be fetched.
    pub listing_fetched: bool,
    pub candidates_harvested: usize,
    pub urls_selected: usize,
    pub duplicates_skipped: usize,
    pub unreadable_skipped: usize,
    pub articles_accepted: usize,
}

/// The collected output of one run.
///
/// Built once by the orchestrator, rendered once by the digest assembler and
/// handed once to a dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Digest {
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The edition: "morning", "afternoon", or "evening".
    pub time_of_day: String,
    /// Articles in source order, then selection order within a source.
    pub articles: Vec<Article>,
    pub reports: Vec<SourceReport>,
}

impl Digest {
    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, base_url: Option<&str>) -> Source {
        Source {
            name: "Opinion".to_string(),
            url: url.to_string(),
            target_count: 3,
            section_marker: "/opinion/".to_string(),
            base_url: base_url.map(str::to_string),
        }
    }

    #[test]
    fn test_site_base_defaults_to_origin() {
        let s = source("https://www.prothomalo.com/opinion/editorial", None);
        assert_eq!(s.site_base(), "https://www.prothomalo.com");
    }

    #[test]
    fn test_site_base_prefers_explicit_base() {
        let s = source(
            "https://www.prothomalo.com/opinion",
            Some("https://m.prothomalo.com"),
        );
        assert_eq!(s.site_base(), "https://m.prothomalo.com");
    }

    #[test]
    fn test_source_deserialization_without_base() {
        let yaml = r#"
name: Editorial
url: https://www.prothomalo.com/opinion/editorial
target_count: 3
section_marker: /opinion/
"#;
        let s: Source = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.name, "Editorial");
        assert_eq!(s.target_count, 3);
        assert!(s.base_url.is_none());
    }

    #[test]
    fn test_digest_serialization() {
        let digest = Digest {
            local_date: "2025-05-06".to_string(),
            time_of_day: "morning".to_string(),
            articles: vec![Article {
                section: "Opinion".to_string(),
                title: "A headline".to_string(),
                url: "https://example.com/opinion/a".to_string(),
                body: "Body".to_string(),
            }],
            reports: vec![],
        };

        let json = serde_json::to_string(&digest).unwrap();
        assert!(json.contains("2025-05-06"));
        assert!(json.contains("A headline"));
        assert_eq!(digest.article_count(), 1);
        assert!(!digest.is_empty());
    }
}
