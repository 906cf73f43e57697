//! LLM-assisted relevance filter.
//!
//! Shows the oracle the first `max_candidates` harvested links of a source and
//! asks for at most `limit` article URLs, most relevant first. A failed call or
//! a response that does not parse as a URL list counts as zero selections.

use super::LinkSelector;
use crate::models::{CandidateLink, Source};
use crate::utils::{looks_truncated, truncate_for_log};
use itertools::Itertools;
use serde::Deserialize;
use std::error::Error;
use tracing::{info, instrument, warn};

/// An external service that ranks candidate links.
///
/// Returns the raw response text; parsing it is the filter's job so every
/// oracle gets the same tolerance for chatty or malformed output.
pub trait RankingOracle {
    async fn rank(
        &self,
        candidates: &[CandidateLink],
        limit: usize,
        exclusions: &[String],
    ) -> Result<String, Box<dyn Error>>;
}

#[derive(Debug)]
pub struct AiFilter<O> {
    oracle: O,
    max_candidates: usize,
    exclusions: Vec<String>,
}

impl<O: RankingOracle> AiFilter<O> {
    pub fn new(oracle: O, max_candidates: usize, exclusions: Vec<String>) -> Self {
        Self {
            oracle,
            max_candidates,
            exclusions,
        }
    }
}

impl<O: RankingOracle> LinkSelector for AiFilter<O> {
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn select(&self, source: &Source, candidates: &[CandidateLink], limit: usize) -> Vec<String> {
        if candidates.is_empty() || limit == 0 {
            return Vec::new();
        }
        let shown = &candidates[..candidates.len().min(self.max_candidates)];

        let response = match self.oracle.rank(shown, limit, &self.exclusions).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Ranking oracle failed; selecting nothing for this source");
                return Vec::new();
            }
        };

        let Some(urls) = parse_ranking(&response) else {
            warn!(
                response_preview = %truncate_for_log(&response, 300),
                "Oracle returned no parsable URL list; selecting nothing for this source"
            );
            return Vec::new();
        };

        let selected: Vec<String> = urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unique()
            .take(limit)
            .collect();
        info!(
            shown = shown.len(),
            selected = selected.len(),
            limit,
            "AI selection"
        );
        selected
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Ranking {
    Urls(Vec<String>),
    Links(Vec<RankedLink>),
    Wrapped { urls: Vec<String> },
}

#[derive(Deserialize)]
struct RankedLink {
    url: String,
}

/// Parse an oracle response into a URL list.
///
/// Accepts a bare JSON array of strings, an array of `{"url": ...}` objects,
/// or `{"urls": [...]}`, optionally wrapped in prose or a Markdown code fence.
pub fn parse_ranking(response: &str) -> Option<Vec<String>> {
    let start = response.find(['[', '{'])?;
    let end = response.rfind([']', '}'])?;
    if end < start {
        return None;
    }
    let json = &response[start..=end];

    match serde_json::from_str::<Ranking>(json) {
        Ok(Ranking::Urls(urls)) | Ok(Ranking::Wrapped { urls }) => Some(urls),
        Ok(Ranking::Links(links)) => Some(links.into_iter().map(|l| l.url).collect()),
        Err(e) => {
            if looks_truncated(&e) {
                warn!(error = %e, "Oracle response looks truncated");
            }
            None
        }
    }
}
