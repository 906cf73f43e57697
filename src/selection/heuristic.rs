//! Pattern and length based relevance filter.
//!
//! Listing pages interleave article permalinks with navigation, login, share
//! and tag links. A link is taken as an article when its href contains the
//! source's section marker, contains none of the excluded substrings, and
//! either the href or the anchor text is long enough to look like a permalink.
//!
//! Deciding is cheap, so every accepted href is returned in listing order and
//! the orchestrator walks them until the source's target is met. Listing cards
//! usually link the same article twice (image and headline); capping here
//! would let those repeats crowd out articles further down the page.

use super::LinkSelector;
use crate::config::HeuristicSettings;
use crate::models::{CandidateLink, Source};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct HeuristicFilter {
    settings: HeuristicSettings,
}

impl HeuristicFilter {
    pub fn new(settings: HeuristicSettings) -> Self {
        Self { settings }
    }

    /// Decide a single link.
    pub fn accepts(&self, link: &CandidateLink, section_marker: &str) -> bool {
        let href = link.href.as_str();
        if !href.contains(section_marker) {
            return false;
        }
        if let Some(excluded) = self
            .settings
            .exclusions
            .iter()
            .find(|x| href.contains(x.as_str()))
        {
            debug!(%href, %excluded, "Rejected excluded link");
            return false;
        }
        href.chars().count() > self.settings.min_href_chars
            || link.text.chars().count() > self.settings.min_text_chars
    }
}

impl LinkSelector for HeuristicFilter {
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn select(&self, source: &Source, candidates: &[CandidateLink], _limit: usize) -> Vec<String> {
        let selected: Vec<String> = candidates
            .iter()
            .filter(|link| self.accepts(link, &source.section_marker))
            .map(|link| link.href.clone())
            .collect();
        info!(
            candidates = candidates.len(),
            selected = selected.len(),
            "Heuristic selection"
        );
        selected
    }
}
