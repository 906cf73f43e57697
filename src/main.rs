//! # Opinion Digest
//!
//! Harvests opinion and editorial articles from a news site's listing pages,
//! extracts readable article text, deduplicates across sections, and
//! assembles a plain-text digest for delivery.
//!
//! ## Usage
//!
//! ```sh
//! opinion_digest -c sources.yaml -o ./digests
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Harvesting**: collect every link on each source's listing page
//! 2. **Selection**: keep article links, by heuristics or by asking an LLM
//! 3. **Extraction**: fetch each new article and recover headline and body
//! 4. **Output**: render the digest (or a diagnostic report) and dispatch it

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod selection;
mod urls;
mod utils;

use api::LlmOracle;
use cli::Cli;
use fetch::ReqwestFetcher;
use outputs::digest::render;
use outputs::dispatch::{Dispatcher, FileDispatcher, StdoutDispatcher};
use pipeline::Pipeline;
use config::{FilterKind, load_config};
use scrapers::article::ArticleExtractor;
use selection::ai::AiFilter;
use selection::heuristic::HeuristicFilter;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("opinion_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut run = load_config(args.config.as_deref())?;
    if let Some(filter) = args.filter {
        run.filter = filter;
    }
    if args.recipient.is_some() {
        run.recipient = args.recipient.clone();
    }
    info!(
        sources = run.sources.len(),
        filter = ?run.filter,
        recipient = run.recipient.as_deref().unwrap_or("-"),
        "Configuration ready"
    );

    let fetcher = ReqwestFetcher::new(&run.fetch)?;
    let extractor = ArticleExtractor::new(&run.extraction)?;
    let headroom = run.pipeline.selection_headroom;

    // ---- Harvest, select, extract ----
    let digest = match run.filter {
        FilterKind::Heuristic => {
            let selector = HeuristicFilter::new(run.heuristic.clone());
            Pipeline::new(fetcher, selector, extractor, headroom)
                .run(&run.sources)
                .await
        }
        FilterKind::Ai => {
            let oracle = LlmOracle::load(&run.ai).await?;
            let selector = AiFilter::new(oracle, run.ai.max_candidates, run.ai.exclusions.clone());
            Pipeline::new(fetcher, selector, extractor, headroom)
                .run(&run.sources)
                .await
        }
    };

    // ---- Render and dispatch ----
    let rendered = render(&digest, &run.digest);
    if digest.is_empty() {
        info!("Scanned all sources but found no valid articles; sending diagnostic report");
    }

    let sent = if args.stdout {
        StdoutDispatcher::new(run.recipient.clone())
            .send(&digest, &rendered)
            .await
    } else {
        FileDispatcher::new(args.output_dir.clone(), run.recipient.clone())
            .send(&digest, &rendered)
            .await
    };

    if let Err(e) = sent {
        error!(
            error = %e,
            subject = %rendered.subject,
            body = %rendered.body,
            "Failed to dispatch digest"
        );
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = digest.article_count(),
        edition = %digest.time_of_day,
        date = %digest.local_date,
        "Execution complete"
    );
    Ok(())
}
