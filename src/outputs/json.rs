//! JSON snapshot of a run's digest.
//!
//! Written next to the text digest so the collected articles and per-source
//! counters can be inspected or post-processed without re-running the
//! pipeline. The file name follows the digest's date and edition:
//! `{output_dir}/{date}_{time_of_day}.json`.

use crate::error::DispatchError;
use crate::models::Digest;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Path of the JSON snapshot for `digest` inside `output_dir`.
pub fn snapshot_path(output_dir: &str, digest: &Digest) -> PathBuf {
    Path::new(output_dir).join(format!("{}_{}.json", digest.local_date, digest.time_of_day))
}

/// Serialize `digest` to `{output_dir}/{date}_{time_of_day}.json`.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_digest(digest: &Digest, output_dir: &str) -> Result<PathBuf, DispatchError> {
    let json = serde_json::to_string_pretty(digest)?;
    let path = snapshot_path(output_dir, digest);

    fs::write(&path, json).await.map_err(|source| DispatchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), articles = digest.article_count(), "Wrote JSON snapshot");
    Ok(path)
}
