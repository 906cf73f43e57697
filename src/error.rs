//! Error types for the fallible edges of the pipeline.
//!
//! The core stages (harvesting, selection, extraction) never surface these to
//! the orchestrator: a [`FetchError`] degrades to "no document" and is logged.
//! Configuration and dispatch errors do reach `main` and set the exit status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid URL for source \"{source_name}\": {reason}")]
    InvalidSource { source_name: String, reason: String },

    #[error("invalid container selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to write digest to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory {path} is not writable: {reason}")]
    Unwritable { path: String, reason: String },

    #[error("failed to serialize digest: {0}")]
    Serialize(#[from] serde_json::Error),
}
