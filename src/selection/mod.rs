//! Relevance filtering: which harvested links are articles worth visiting.
//!
//! Both strategies implement [`LinkSelector`] and are interchangeable from
//! the orchestrator's point of view:
//!
//! | Strategy | Module | Decides by |
//! |----------|--------|------------|
//! | Heuristic | [`heuristic`] | section marker, excluded substrings, href/text length |
//! | AI | [`ai`] | an LLM ranking oracle over the first N candidates |

pub mod ai;
pub mod heuristic;

use crate::models::{CandidateLink, Source};

/// Picks article links out of a listing page's candidates.
pub trait LinkSelector {
    /// Return hrefs (absolute or relative), most relevant first. Never fails;
    /// a strategy that cannot decide returns nothing.
    ///
    /// `limit` bounds strategies that pay per URL, such as the LLM ranking.
    /// Strategies that decide one link at a time may return every accepted
    /// href; the orchestrator stops once the source's target is met.
    async fn select(&self, source: &Source, candidates: &[CandidateLink], limit: usize) -> Vec<String>;
}
