//! LLM-backed ranking oracle with exponential backoff retry logic.
//!
//! The AI relevance filter asks an OpenAI-compatible LLM which harvested
//! links are genuine articles. This module provides that oracle:
//!
//! - [`AskAsync`]: one request, one reply
//! - [`AwfulJadeClient`]: `awful_aj::api::ask` behind that trait
//! - [`RetryAsk`] and [`Backoff`]: retries with exponential backoff and jitter
//! - [`LlmOracle`]: builds the ranking prompt and bounds the whole call by a timeout

use crate::config::AiSettings;
use crate::models::CandidateLink;
use crate::selection::ai::RankingOracle;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use rand::{Rng, rng};
use serde_json::json;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and receive a response. This allows
/// decorators such as [`RetryAsk`] to wrap any backend.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Delay schedule between ranking attempts.
///
/// The wait before retry `n` (1-based) is
/// ```text
/// min(base * 2^(n-1), cap) + jitter, jitter drawn from 0..=max_jitter
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: StdDuration,
    pub cap: StdDuration,
    pub max_jitter: StdDuration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: StdDuration::from_secs(1),
            cap: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }
}

impl Backoff {
    /// Deterministic part of the wait before retry `attempt`.
    pub fn ceiling(&self, attempt: usize) -> StdDuration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        self.base.saturating_mul(1u32 << exp).min(self.cap)
    }

    /// The wait before retry `attempt`, jitter included.
    pub fn delay(&self, attempt: usize) -> StdDuration {
        let jitter_ms = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        self.ceiling(attempt) + StdDuration::from_millis(jitter_ms)
    }
}

/// Decorator that retries any [`AskAsync`] on error following a [`Backoff`].
///
/// `max_retries` counts retries, not attempts: with `max_retries = 2` the
/// inner client is called at most three times.
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    backoff: Backoff,
}

impl<T: AskAsync> RetryAsk<T> {
    pub fn new(inner: T, max_retries: usize, backoff: Backoff) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<T: AskAsync> AskAsync for RetryAsk<T> {
    type Response = T::Response;

    #[instrument(level = "info", skip_all, fields(max_retries = self.max_retries))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let started = Instant::now();
        let mut retry = 0usize;
        loop {
            let err = match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };
            if retry >= self.max_retries {
                error!(
                    attempts = retry + 1,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Ranking request failed on every attempt"
                );
                return Err(err);
            }
            let delay = self.backoff.delay(retry + 1);
            warn!(attempt = retry + 1, ?delay, error = %err, "Ranking request failed; retrying");
            sleep(delay).await;
            retry += 1;
        }
    }
}

/// [`AskAsync`] over `awful_aj::api::ask` with a loaded config and template.
#[derive(Debug)]
pub struct AwfulJadeClient<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl AskAsync for AwfulJadeClient<'_> {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let started = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        match &res {
            Ok(reply) => debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                reply_chars = reply.chars().count(),
                "LLM replied"
            ),
            Err(e) => warn!(elapsed_ms = started.elapsed().as_millis() as u64, error = %e, "LLM call failed"),
        }
        res
    }
}

/// [`RankingOracle`] that asks an LLM through `awful_aj`.
///
/// Each ranking call is retried with backoff and bounded as a whole by
/// `timeout`; hitting the bound is reported as an error.
pub struct LlmOracle {
    config: AwfulJadeConfig,
    template: ChatTemplate,
    max_retries: usize,
    timeout: StdDuration,
}

impl LlmOracle {
    pub fn new(
        config: AwfulJadeConfig,
        template: ChatTemplate,
        max_retries: usize,
        timeout: StdDuration,
    ) -> Self {
        Self {
            config,
            template,
            max_retries,
            timeout,
        }
    }

    /// Build the oracle from the awful_aj config directory and the chat
    /// template named in `settings`.
    ///
    /// # Arguments
    ///
    /// * `settings` - Template name, retry count and overall timeout
    ///
    /// # Returns
    ///
    /// A ready oracle. The endpoint and model come from
    /// `<awful_aj config dir>/config.yaml`.
    ///
    /// # Errors
    ///
    /// Fails if the template cannot be loaded, the config directory cannot be
    /// resolved, or `config.yaml` is missing or malformed.
    #[instrument(level = "info", skip_all, fields(template = %settings.template))]
    pub async fn load(settings: &AiSettings) -> Result<Self, Box<dyn Error>> {
        let template = template::load_template(&settings.template).await?;
        info!("Loaded ranking template");

        let conf_file = config_dir()?.join("config.yaml");
        let config_path = conf_file
            .to_str()
            .ok_or("awful_aj config path is not valid UTF-8")?;
        let config = awful_aj::config::load_config(config_path)
            .map_err(|e| format!("failed to load LLM config {config_path}: {e}"))?;
        info!(config_path, "Loaded LLM configuration");

        Ok(Self::new(config, template, settings.max_retries, settings.timeout()))
    }
}

impl fmt::Debug for LlmOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmOracle")
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RankingOracle for LlmOracle {
    /// Ask the LLM to rank `candidates`.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Links already capped by the caller
    /// * `limit` - Maximum number of URLs the reply should contain
    /// * `exclusions` - Kinds of links to leave out, spelled for the prompt
    ///
    /// # Returns
    ///
    /// The raw reply text; [`crate::selection::ai::parse_ranking`] turns it
    /// into URLs.
    #[instrument(level = "info", skip_all, fields(candidates = candidates.len(), limit))]
    async fn rank(
        &self,
        candidates: &[CandidateLink],
        limit: usize,
        exclusions: &[String],
    ) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let prompt = ranking_prompt(candidates, limit, exclusions);
        let client = AwfulJadeClient {
            config: &self.config,
            template: &self.template,
        };
        let api = RetryAsk::new(client, self.max_retries, Backoff::default());

        let res = match timeout(self.timeout, api.ask(&prompt)).await {
            Ok(res) => res,
            Err(_) => Err(format!("ranking call exceeded {:?}", self.timeout).into()),
        };

        let dt = t0.elapsed();
        match &res {
            Ok(_) => info!(elapsed_ms_total = dt.as_millis() as u64, "Ranking succeeded"),
            Err(e) => error!(elapsed_ms_total = dt.as_millis() as u64, error = %e, "Ranking failed"),
        }
        res
    }
}

/// Build the instruction sent to the LLM for one source.
///
/// Candidates are embedded as a pretty-printed JSON list of
/// `{"text", "url"}` objects, hrefs verbatim so the reply can echo them.
///
/// # Arguments
///
/// * `candidates` - Links to choose from
/// * `limit` - Upper bound stated in the instruction
/// * `exclusions` - Joined into an "Exclude ..." line; a generic phrase when empty
pub fn ranking_prompt(candidates: &[CandidateLink], limit: usize, exclusions: &[String]) -> String {
    let links: Vec<_> = candidates
        .iter()
        .map(|c| json!({ "text": c.text, "url": c.href }))
        .collect();
    let links = serde_json::to_string_pretty(&links).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Below are links harvested from a news site's listing page, as JSON objects with \
the anchor text and URL.\n\
Pick at most {limit} links that point to genuine individual articles, most relevant first.\n\
Exclude {}.\n\
Reply with only a JSON array of the chosen URL strings, copied exactly as given, and nothing else.\n\n\
{links}",
        if exclusions.is_empty() {
            "anything that is not an article".to_string()
        } else {
            exclusions.join(", ")
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Flaky {
        failures_left: Cell<usize>,
        calls: Cell<usize>,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("temporary failure".into());
            }
            Ok(format!("echo: {text}"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_failures() {
        let inner = Flaky {
            failures_left: Cell::new(2),
            calls: Cell::new(0),
        };
        let api = RetryAsk::new(inner, 3, Backoff::default());

        let res = api.ask("hi").await.unwrap();
        assert_eq!(res, "echo: hi");
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let inner = Flaky {
            failures_left: Cell::new(10),
            calls: Cell::new(0),
        };
        let api = RetryAsk::new(inner, 2, Backoff::default());

        assert!(api.ask("hi").await.is_err());
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let backoff = Backoff::default();
        assert_eq!(backoff.ceiling(1), StdDuration::from_secs(1));
        assert_eq!(backoff.ceiling(2), StdDuration::from_secs(2));
        assert_eq!(backoff.ceiling(5), StdDuration::from_secs(16));
        assert_eq!(backoff.ceiling(6), StdDuration::from_secs(30));
        assert_eq!(backoff.ceiling(usize::MAX), StdDuration::from_secs(30));
    }

    #[test]
    fn test_backoff_jitter_is_bounded() {
        let backoff = Backoff::default();
        for attempt in 1..=4 {
            let delay = backoff.delay(attempt);
            assert!(delay >= backoff.ceiling(attempt));
            assert!(delay <= backoff.ceiling(attempt) + backoff.max_jitter);
        }
    }

    #[test]
    fn test_ranking_prompt_lists_candidates_and_limit() {
        let candidates = vec![CandidateLink {
            text: "নদী বাঁচাও".to_string(),
            href: "/opinion/column/rivers".to_string(),
        }];
        let prompt = ranking_prompt(&candidates, 4, &["login".to_string(), "social media".to_string()]);

        assert!(prompt.contains("at most 4 links"));
        assert!(prompt.contains("Exclude login, social media."));
        assert!(prompt.contains("\"url\": \"/opinion/column/rivers\""));
        assert!(prompt.contains("নদী বাঁচাও"));
    }
}
