//! Digest delivery.
//!
//! A [`Dispatcher`] receives the rendered digest exactly once per run. The
//! recipient is fixed when the dispatcher is built. Delivery failures are
//! returned to `main`, which logs them and exits non-zero; the digest itself
//! has already been logged by then.

use super::digest::RenderedDigest;
use super::json;
use crate::error::DispatchError;
use crate::models::Digest;
use crate::utils::ensure_writable_dir;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub trait Dispatcher {
    async fn send(&self, digest: &Digest, rendered: &RenderedDigest) -> Result<(), DispatchError>;
}

/// The message as it would be handed to a mail transport.
fn envelope(recipient: Option<&str>, rendered: &RenderedDigest) -> String {
    format!(
        "To: {}\nSubject: {}\n\n{}",
        recipient.unwrap_or("(no recipient configured)"),
        rendered.subject,
        rendered.body
    )
}

/// Writes `{date}_{time_of_day}.txt` plus a JSON snapshot into a directory.
#[derive(Debug, Clone)]
pub struct FileDispatcher {
    output_dir: String,
    recipient: Option<String>,
}

impl FileDispatcher {
    pub fn new(output_dir: impl Into<String>, recipient: Option<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            recipient,
        }
    }

    pub fn digest_path(&self, digest: &Digest) -> PathBuf {
        Path::new(&self.output_dir).join(format!("{}_{}.txt", digest.local_date, digest.time_of_day))
    }
}

impl Dispatcher for FileDispatcher {
    #[instrument(level = "info", skip_all, fields(output_dir = %self.output_dir))]
    async fn send(&self, digest: &Digest, rendered: &RenderedDigest) -> Result<(), DispatchError> {
        ensure_writable_dir(&self.output_dir)
            .await
            .map_err(|e| DispatchError::Unwritable {
                path: self.output_dir.clone(),
                reason: e.to_string(),
            })?;

        let path = self.digest_path(digest);
        let message = envelope(self.recipient.as_deref(), rendered);
        fs::write(&path, message).await.map_err(|source| DispatchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), subject = %rendered.subject, "Wrote digest");

        json::write_digest(digest, &self.output_dir).await?;
        Ok(())
    }
}

/// Prints the digest to standard output.
#[derive(Debug, Clone, Default)]
pub struct StdoutDispatcher {
    recipient: Option<String>,
}

impl StdoutDispatcher {
    pub fn new(recipient: Option<String>) -> Self {
        Self { recipient }
    }
}

impl Dispatcher for StdoutDispatcher {
    async fn send(&self, _digest: &Digest, rendered: &RenderedDigest) -> Result<(), DispatchError> {
        let message = envelope(self.recipient.as_deref(), rendered);
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(message.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|source| DispatchError::Io {
                path: "<stdout>".to_string(),
                source,
            })?;
        info!(subject = %rendered.subject, "Printed digest");
        Ok(())
    }
}
