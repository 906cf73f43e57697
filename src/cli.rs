//! Command-line interface definitions.
//!
//! Every option can also come from the run configuration file; flags given
//! here win over the file.

use crate::config::FilterKind;
use clap::Parser;

/// Harvest opinion articles and assemble a digest.
///
/// # Examples
///
/// ```sh
/// # Built-in sources, heuristic filter, digest written to ./digests
/// opinion_digest
///
/// # Custom sources, LLM-assisted filter, print instead of writing files
/// opinion_digest -c sources.yaml --filter ai --stdout
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML run configuration (built-in sources when omitted)
    #[arg(short, long, env = "DIGEST_CONFIG")]
    pub config: Option<String>,

    /// Output directory for the digest and its JSON snapshot
    #[arg(short, long, default_value = "./digests")]
    pub output_dir: String,

    /// Relevance filter to use, overriding the config file
    #[arg(long, value_enum)]
    pub filter: Option<FilterKind>,

    /// Who the digest is addressed to, overriding the config file
    #[arg(long, env = "DIGEST_RECIPIENT")]
    pub recipient: Option<String>,

    /// Print the digest to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,
}
