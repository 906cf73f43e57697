//! Article content extraction.
//!
//! Recovers a headline and readable body from an article page through an
//! ordered chain of container strategies: each configured CSS selector in
//! turn (by default the story-body class, then `article`), then the whole
//! document. The first strategy that yields at least one paragraph above the
//! length threshold wins.
//!
//! Extraction never fails. A page that cannot be fetched, has no headline, or
//! whose body is too short comes back with a sentinel and an [`Outcome`] that
//! tells the orchestrator how far extraction got.

use super::{element_text, paragraph_text};
use crate::config::ExtractionSettings;
use crate::error::ConfigError;
use crate::fetch::Fetcher;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

/// Title returned when the page could not be fetched.
pub const UNREADABLE_TITLE: &str = "Could not read article.";
/// Title returned when the page has no level-1 heading.
pub const NO_HEADLINE: &str = "Unknown/No Headline Found";
/// Body returned when too little text was recovered.
pub const THIN_BODY: &str = "Could not extract the article text (content likely paywalled, \
JS-rendered, or the container heuristic failed). Please follow the link to read it.";

static HEADLINE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid h1 selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid p selector"));

/// How far extraction got for one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Headline and a body above the minimum length.
    Complete,
    /// Headline found, body replaced by [`THIN_BODY`].
    ThinBody,
    /// No headline on the page.
    NoHeadline,
    /// The page could not be fetched.
    Unreadable,
}

/// A `(title, body)` pair, possibly holding sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub body: String,
    pub outcome: Outcome,
}

impl Extracted {
    fn unreadable() -> Self {
        Self {
            title: UNREADABLE_TITLE.to_string(),
            body: String::new(),
            outcome: Outcome::Unreadable,
        }
    }

    /// Whether the article is worth putting in the digest: a real headline
    /// was found, even if the body had to be replaced by the advisory.
    pub fn is_acceptable(&self) -> bool {
        matches!(self.outcome, Outcome::Complete | Outcome::ThinBody)
    }
}

#[derive(Debug)]
enum Container {
    Selector(Selector),
    WholeDocument,
}

/// Content extractor configured with a container chain and length thresholds.
#[derive(Debug)]
pub struct ArticleExtractor {
    chain: Vec<Container>,
    min_paragraph_chars: usize,
    min_total_body_chars: usize,
}

impl ArticleExtractor {
    /// Build the extractor, compiling the configured container selectors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSelector`] if a selector does not parse.
    pub fn new(settings: &ExtractionSettings) -> Result<Self, ConfigError> {
        let mut chain = Vec::with_capacity(settings.container_selectors.len() + 1);
        for raw in &settings.container_selectors {
            let selector = Selector::parse(raw).map_err(|e| ConfigError::InvalidSelector {
                selector: raw.clone(),
                reason: e.to_string(),
            })?;
            chain.push(Container::Selector(selector));
        }
        chain.push(Container::WholeDocument);

        Ok(Self {
            chain,
            min_paragraph_chars: settings.min_paragraph_chars,
            min_total_body_chars: settings.min_total_body_chars,
        })
    }

    /// Fetch `url` and extract its headline and body.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn extract<F: Fetcher>(&self, fetcher: &F, url: &str) -> Extracted {
        match fetcher.fetch(url).await {
            Ok(html) => {
                let extracted = self.extract_from_html(&html);
                info!(
                    outcome = ?extracted.outcome,
                    chars = extracted.body.chars().count(),
                    "Extracted article"
                );
                extracted
            }
            Err(e) => {
                warn!(error = %e, %url, "Article fetch failed");
                Extracted::unreadable()
            }
        }
    }

    /// Extract from an already-fetched page.
    pub fn extract_from_html(&self, html: &str) -> Extracted {
        let document = Html::parse_document(html);

        let title = document
            .select(&HEADLINE)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());

        let paragraphs = self.paragraphs(&document);
        let body = paragraphs.join("\n\n");
        let thin = body.chars().count() < self.min_total_body_chars;
        let body = if thin { THIN_BODY.to_string() } else { body };

        match title {
            Some(title) => Extracted {
                title,
                body,
                outcome: if thin {
                    Outcome::ThinBody
                } else {
                    Outcome::Complete
                },
            },
            None => Extracted {
                title: NO_HEADLINE.to_string(),
                body,
                outcome: Outcome::NoHeadline,
            },
        }
    }

    fn paragraphs(&self, document: &Html) -> Vec<String> {
        for (position, container) in self.chain.iter().enumerate() {
            let kept = match container {
                Container::Selector(selector) => match document.select(selector).next() {
                    Some(found) => self.keep_substantial(found.select(&PARAGRAPH)),
                    None => continue,
                },
                Container::WholeDocument => self.keep_substantial(document.select(&PARAGRAPH)),
            };
            if !kept.is_empty() {
                debug!(strategy = position, paragraphs = kept.len(), "Container matched");
                return kept;
            }
        }
        Vec::new()
    }

    fn keep_substantial<'a>(&self, paragraphs: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
        paragraphs
            .map(paragraph_text)
            .filter(|text| text.chars().count() > self.min_paragraph_chars)
            .collect()
    }
}
