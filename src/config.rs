//! Run configuration loaded from YAML.
//!
//! Every section has serde defaults, so a config file only needs to name what
//! it changes. Without a config file the built-in default harvests the
//! Prothom Alo opinion and editorial listings.
//!
//! ```yaml
//! recipient: reader@example.com
//! filter: heuristic
//! sources:
//!   - name: Opinion
//!     url: https://www.prothomalo.com/opinion
//!     target_count: 10
//!     section_marker: /opinion/
//! extraction:
//!   min_paragraph_chars: 20
//! digest:
//!   max_body_chars: 3000
//! ```

use crate::error::ConfigError;
use crate::models::Source;
use clap::ValueEnum;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Browser identification sent with every page request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Which relevance filter decides which harvested links are articles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Substring and length rules.
    #[default]
    Heuristic,
    /// Delegate the choice to an LLM ranking oracle.
    Ai,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Who the digest is addressed to.
    pub recipient: Option<String>,
    pub filter: FilterKind,
    pub sources: Vec<Source>,
    pub heuristic: HeuristicSettings,
    pub ai: AiSettings,
    pub extraction: ExtractionSettings,
    pub digest: DigestSettings,
    pub fetch: FetchSettings,
    pub pipeline: PipelineSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            filter: FilterKind::default(),
            sources: vec![
                Source {
                    name: "Mitamot (Opinion)".to_string(),
                    url: "https://www.prothomalo.com/opinion".to_string(),
                    target_count: 10,
                    section_marker: "/opinion/".to_string(),
                    base_url: None,
                },
                Source {
                    name: "Sompadokiyo (Editorial)".to_string(),
                    url: "https://www.prothomalo.com/opinion/editorial".to_string(),
                    target_count: 3,
                    section_marker: "/opinion/".to_string(),
                    base_url: None,
                },
            ],
            heuristic: HeuristicSettings::default(),
            ai: AiSettings::default(),
            extraction: ExtractionSettings::default(),
            digest: DigestSettings::default(),
            fetch: FetchSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

/// Tuning for the pattern/length relevance filter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeuristicSettings {
    /// A link whose href contains any of these is never an article.
    pub exclusions: Vec<String>,
    /// Accept when the href is longer than this many characters...
    pub min_href_chars: usize,
    /// ...or when the anchor text is longer than this many characters.
    pub min_text_chars: usize,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            exclusions: ["auth", "login", "collection", "topic", "api", "facebook", "twitter"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_href_chars: 30,
            min_text_chars: 30,
        }
    }
}

/// Tuning for the LLM-assisted relevance filter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiSettings {
    /// Only the first this-many harvested links are shown to the oracle.
    pub max_candidates: usize,
    /// Name of the awful_aj chat template used for ranking.
    pub template: String,
    pub max_retries: usize,
    /// Upper bound on one ranking call, retries included.
    pub timeout_secs: u64,
    /// Kinds of links the oracle is told to leave out.
    pub exclusions: Vec<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            max_candidates: 60,
            template: "article_selector".to_string(),
            max_retries: 3,
            timeout_secs: 120,
            exclusions: ["navigation", "social media", "login", "collection", "tag or topic pages"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl AiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Thresholds for the content extractor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// CSS selectors tried in order for the article container. The whole
    /// document is always tried last.
    pub container_selectors: Vec<String>,
    /// Paragraphs with this many characters or fewer are dropped as captions
    /// and menu fragments.
    pub min_paragraph_chars: usize,
    /// Bodies shorter than this are treated as an extraction miss.
    pub min_total_body_chars: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            container_selectors: vec!["div.story-content".to_string(), "article".to_string()],
            min_paragraph_chars: 10,
            min_total_body_chars: 80,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestSettings {
    /// Per-article body length in the rendered digest, in characters.
    pub max_body_chars: usize,
    pub subject_prefix: String,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            max_body_chars: 1000,
            subject_prefix: "Daily News Feed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            connect_timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Extra URLs requested from the selector beyond a source's target count,
    /// so duplicates and unreadable pages don't starve it.
    pub selection_headroom: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            selection_headroom: 5,
        }
    }
}

impl RunConfig {
    /// Parse and validate a YAML config document.
    pub fn from_yaml(path: &str, yaml: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in &self.sources {
            Url::parse(&source.url).map_err(|e| ConfigError::InvalidSource {
                source_name: source.name.clone(),
                reason: format!("{}: {e}", source.url),
            })?;
            if let Some(base) = &source.base_url {
                Url::parse(base).map_err(|e| ConfigError::InvalidSource {
                    source_name: source.name.clone(),
                    reason: format!("base_url {base}: {e}"),
                })?;
            }
        }

        for selector in &self.extraction.container_selectors {
            Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                selector: selector.clone(),
                reason: e.to_string(),
            })?;
        }

        if self.digest.max_body_chars == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "digest.max_body_chars",
                reason: "must be greater than zero".to_string(),
            });
        }
        for (field, value) in [
            ("fetch.timeout_secs", self.fetch.timeout_secs),
            ("fetch.connect_timeout_secs", self.fetch.connect_timeout_secs),
            ("ai.timeout_secs", self.ai.timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Load the run configuration from `path`, or the built-in default when no
/// path is given.
#[instrument(level = "info")]
pub fn load_config(path: Option<&str>) -> Result<RunConfig, ConfigError> {
    let Some(path) = path else {
        info!("No config file given; using built-in sources");
        return Ok(RunConfig::default());
    };

    let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    let config = RunConfig::from_yaml(path, &yaml)?;
    info!(sources = config.sources.len(), filter = ?config.filter, "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].target_count, 10);
        assert_eq!(config.sources[1].target_count, 3);
        assert_eq!(config.filter, FilterKind::Heuristic);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
filter: ai
extraction:
  min_paragraph_chars: 20
digest:
  max_body_chars: 3000
"#;
        let config = RunConfig::from_yaml("test.yaml", yaml).unwrap();
        assert_eq!(config.filter, FilterKind::Ai);
        assert_eq!(config.extraction.min_paragraph_chars, 20);
        assert_eq!(config.extraction.min_total_body_chars, 80);
        assert_eq!(config.digest.max_body_chars, 3000);
        assert_eq!(config.digest.subject_prefix, "Daily News Feed");
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn test_explicit_empty_sources() {
        let config = RunConfig::from_yaml("test.yaml", "sources: []\n").unwrap();
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_rejects_bad_source_url() {
        let yaml = r#"
sources:
  - name: Broken
    url: not a url
    target_count: 3
    section_marker: /opinion/
"#;
        let err = RunConfig::from_yaml("test.yaml", yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidSource { ref source_name, .. } if source_name == "Broken"),
            "expected InvalidSource, got: {err:?}"
        );
    }

    #[test]
    fn test_rejects_bad_selector() {
        let yaml = r#"
extraction:
  container_selectors: ["div..story"]
"#;
        let err = RunConfig::from_yaml("test.yaml", yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }), "got: {err:?}");
    }

    #[test]
    fn test_rejects_zero_truncation() {
        let yaml = "digest:\n  max_body_chars: 0\n";
        let err = RunConfig::from_yaml("test.yaml", yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { field: "digest.max_body_chars", .. }));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        for (yaml, expected) in [
            ("fetch:\n  timeout_secs: 0\n", "fetch.timeout_secs"),
            ("fetch:\n  connect_timeout_secs: 0\n", "fetch.connect_timeout_secs"),
            ("ai:\n  timeout_secs: 0\n", "ai.timeout_secs"),
        ] {
            match RunConfig::from_yaml("test.yaml", yaml) {
                Err(ConfigError::InvalidSetting { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidSetting for {expected}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_config_without_path_uses_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config.sources[0].url, "https://www.prothomalo.com/opinion");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
