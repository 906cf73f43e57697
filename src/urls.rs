//! URL normalization and per-run deduplication.

use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Turn a possibly relative `href` into an absolute URL against `base`.
///
/// Absolute and relative hrefs both come back in the serialized form of
/// [`Url`] (percent-encoded path, lowercase host), so one article reached
/// both ways yields the same string. Serialization is a fixed point, which
/// makes the function idempotent. Relative hrefs are resolved with URL-join
/// rules (`/opinion/x`, `x`, `//host/x`); if `base` itself does not parse, the
/// two strings are concatenated.
pub fn normalize(href: &str, base: &str) -> String {
    let href = href.trim();
    if let Ok(parsed) = Url::parse(href) {
        return parsed.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}{}", base.trim_end_matches('/'), href),
    }
}

/// Absolute URLs already handed to the content extractor during this run.
///
/// Owned by the orchestrator and shared across all sources so overlapping
/// listing pages never yield the same article twice.
#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record `url`. Returns `false` if it was already recorded.
    pub fn mark_seen(&mut self, url: &str) -> bool {
        let inserted = self.urls.insert(url.to_string());
        if !inserted {
            debug!(%url, "URL already marked seen");
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}
