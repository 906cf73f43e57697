//! Plain-text digest rendering.
//!
//! Each article is rendered with the same template:
//!
//! ```text
//! #1 [Opinion]
//! HEADLINE: ...
//! LINK: https://...
//! ----------
//! <body, cut to max_body_chars>...
//!
//! [Read more at the link]
//! ========================================
//! ```
//!
//! An empty digest renders as a diagnostic report instead, so "ran fine but
//! nothing matched" is never mistaken for a real edition or for a crash.

use crate::config::DigestSettings;
use crate::models::{Article, Digest, SourceReport};
use crate::utils::{take_chars, upcase};
use std::fmt::Write;

/// Appended to a body that was cut short.
pub const READ_MORE_SUFFIX: &str = "...\n\n[Read more at the link]";
/// First line of the zero-articles report.
pub const DIAGNOSTIC_HEADER: &str = "DIAGNOSTIC REPORT: zero articles were found in this run.";

const SECTION_RULE: &str = "========================================";
const BODY_RULE: &str = "----------";

/// A digest ready for a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDigest {
    pub subject: String,
    pub body: String,
}

/// Render `digest` into a subject line and a text body.
pub fn render(digest: &Digest, settings: &DigestSettings) -> RenderedDigest {
    if digest.is_empty() {
        return render_diagnostic(digest, settings);
    }

    let count = digest.article_count();
    let mut body = String::new();
    writeln!(
        body,
        "{} edition, {}",
        upcase(&digest.time_of_day),
        digest.local_date
    )
    .unwrap();
    writeln!(body, "Here is your daily collection of {count} articles:").unwrap();
    writeln!(body, "{SECTION_RULE}\n").unwrap();

    for (i, article) in digest.articles.iter().enumerate() {
        body.push_str(&render_article(i + 1, article, settings.max_body_chars));
    }

    RenderedDigest {
        subject: format!("{} ({count} Articles)", settings.subject_prefix),
        body,
    }
}

/// Render one numbered article block.
pub fn render_article(number: usize, article: &Article, max_body_chars: usize) -> String {
    let (shown, truncated) = take_chars(&article.body, max_body_chars);
    let mut block = String::new();
    writeln!(block, "#{number} [{}]", article.section).unwrap();
    writeln!(block, "HEADLINE: {}", article.title).unwrap();
    writeln!(block, "LINK: {}", article.url).unwrap();
    writeln!(block, "{BODY_RULE}").unwrap();
    block.push_str(shown);
    if truncated {
        block.push_str(READ_MORE_SUFFIX);
    }
    writeln!(block).unwrap();
    writeln!(block, "{SECTION_RULE}\n").unwrap();
    block
}

fn render_diagnostic(digest: &Digest, settings: &DigestSettings) -> RenderedDigest {
    let mut body = String::new();
    writeln!(body, "{DIAGNOSTIC_HEADER}").unwrap();
    writeln!(
        body,
        "The run completed ({} edition, {}) but no source produced a qualifying article.",
        upcase(&digest.time_of_day),
        digest.local_date
    )
    .unwrap();
    writeln!(
        body,
        "If listings were fetched but nothing was selected, the site layout or link patterns may have changed.\n"
    )
    .unwrap();

    if digest.reports.is_empty() {
        writeln!(body, "No sources were configured.").unwrap();
    } else {
        writeln!(body, "Sources scanned: {}", digest.reports.len()).unwrap();
        for report in &digest.reports {
            body.push_str(&render_report(report));
        }
    }

    RenderedDigest {
        subject: format!("{} (0 Articles) - diagnostic report", settings.subject_prefix),
        body,
    }
}

fn render_report(report: &SourceReport) -> String {
    if !report.listing_fetched {
        return format!(
            "- [{}] {}: listing page could not be fetched\n",
            report.name, report.listing_url
        );
    }
    format!(
        "- [{}] {}: {} links harvested, {} selected, {} duplicates skipped, {} unreadable skipped, {} accepted\n",
        report.name,
        report.listing_url,
        report.candidates_harvested,
        report.urls_selected,
        report.duplicates_skipped,
        report.unreadable_skipped,
        report.articles_accepted
    )
}
