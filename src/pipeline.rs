//! The run loop.
//!
//! For each source, in configuration order:
//!
//! 1. fetch the listing page and harvest its links
//! 2. ask the configured [`LinkSelector`] for article URLs, bounded by
//!    `target_count + headroom` for strategies that honour a limit
//! 3. for each selected href: normalize, skip if already seen this run,
//!    otherwise mark it seen and extract the article
//! 4. keep articles with a real headline until `target_count` is reached
//!
//! Nothing in here fails. A dead listing page contributes zero articles and a
//! [`SourceReport`] saying so; the digest is always produced.

use crate::fetch::Fetcher;
use crate::models::{Article, Digest, Source, SourceReport};
use crate::scrapers::article::ArticleExtractor;
use crate::scrapers::links::harvest_links;
use crate::selection::LinkSelector;
use crate::urls::{SeenUrls, normalize};
use crate::utils::time_of_day;
use chrono::Local;
use scraper::Html;
use tracing::{debug, info, instrument, warn};

pub struct Pipeline<F, S> {
    fetcher: F,
    selector: S,
    extractor: ArticleExtractor,
    selection_headroom: usize,
}

impl<F: Fetcher, S: LinkSelector> Pipeline<F, S> {
    pub fn new(fetcher: F, selector: S, extractor: ArticleExtractor, selection_headroom: usize) -> Self {
        Self {
            fetcher,
            selector,
            extractor,
            selection_headroom,
        }
    }

    /// Process every source and collect the digest for this run.
    ///
    /// Dedup state starts empty on every call.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run(&self, sources: &[Source]) -> Digest {
        let mut seen = SeenUrls::new();
        let mut articles = Vec::new();
        let mut reports = Vec::with_capacity(sources.len());

        for source in sources {
            let (mut found, report) = self.process_source(source, &mut seen).await;
            articles.append(&mut found);
            reports.push(report);
        }

        info!(
            articles = articles.len(),
            urls_seen = seen.len(),
            "Run complete"
        );
        Digest {
            local_date: Local::now().date_naive().to_string(),
            time_of_day: time_of_day(),
            articles,
            reports,
        }
    }

    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn process_source(&self, source: &Source, seen: &mut SeenUrls) -> (Vec<Article>, SourceReport) {
        let mut report = SourceReport {
            name: source.name.clone(),
            listing_url: source.url.clone(),
            ..SourceReport::default()
        };
        let mut articles = Vec::new();

        info!(url = %source.url, target = source.target_count, "Scanning source");
        let candidates = match self.fetcher.fetch(&source.url).await {
            Ok(html) => {
                report.listing_fetched = true;
                let document = Html::parse_document(&html);
                harvest_links(Some(&document))
            }
            Err(e) => {
                warn!(error = %e, url = %source.url, "Listing fetch failed; skipping source");
                harvest_links(None)
            }
        };
        report.candidates_harvested = candidates.len();

        if candidates.is_empty() || source.target_count == 0 {
            return (articles, report);
        }

        let limit = source.target_count + self.selection_headroom;
        let selected = self.selector.select(source, &candidates, limit).await;
        report.urls_selected = selected.len();

        let base = source.site_base();
        for href in selected {
            if articles.len() >= source.target_count {
                break;
            }

            let url = normalize(&href, &base);
            if seen.has_seen(&url) {
                debug!(%url, "Already collected this run; skipping");
                report.duplicates_skipped += 1;
                continue;
            }
            seen.mark_seen(&url);

            let extracted = self.extractor.extract(&self.fetcher, &url).await;
            if !extracted.is_acceptable() {
                warn!(%url, outcome = ?extracted.outcome, "Skipping article without a readable headline");
                report.unreadable_skipped += 1;
                continue;
            }

            info!(
                %url,
                title = %extracted.title,
                saved = articles.len() + 1,
                target = source.target_count,
                "Saved article"
            );
            articles.push(Article {
                section: source.name.clone(),
                title: extracted.title,
                url,
                body: extracted.body,
            });
        }

        report.articles_accepted = articles.len();
        info!(
            harvested = report.candidates_harvested,
            selected = report.urls_selected,
            accepted = report.articles_accepted,
            "Source done"
        );
        (articles, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionSettings, HeuristicSettings};
    use crate::error::FetchError;
    use crate::models::CandidateLink;
    use crate::outputs::digest::{DIAGNOSTIC_HEADER, render};
    use crate::selection::ai::{AiFilter, RankingOracle};
    use crate::selection::heuristic::HeuristicFilter;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::error::Error;

    const SITE: &str = "https://news.example";

    /// Serves pages from memory and counts every request.
    #[derive(Default)]
    struct MemoryFetcher {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
    }

    impl MemoryFetcher {
        fn with_page(mut self, url: &str, html: String) -> Self {
            self.pages.insert(url.to_string(), html);
            self
        }

        fn requests_for(&self, url: &str) -> usize {
            self.requests.borrow().iter().filter(|u| *u == url).count()
        }
    }

    impl Fetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::UnexpectedStatus {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    struct FixedOracle(&'static str);

    impl RankingOracle for FixedOracle {
        async fn rank(
            &self,
            _candidates: &[CandidateLink],
            _limit: usize,
            _exclusions: &[String],
        ) -> Result<String, Box<dyn Error>> {
            Ok(self.0.to_string())
        }
    }

    fn slug(n: usize) -> String {
        format!("/opinion/column/article-number-{n:02}-abcdef")
    }

    fn listing(numbers: &[usize]) -> String {
        let mut html = String::from("<html><body><nav><a href=\"/login\">Login</a></nav>");
        for n in numbers {
            html.push_str(&format!("<div><a href=\"{}\">Headline {n}</a></div>", slug(*n)));
        }
        html.push_str("<a href=\"/opinion/topic/politics-and-governance\">Politics</a></body></html>");
        html
    }

    fn article_page(n: usize) -> String {
        format!(
            "<html><body><h1>Headline {n}</h1><div class=\"story-content\">\
             <p>Photo</p>\
             <p>This is the first substantial paragraph of article number {n}.</p>\
             <p>And this is the second substantial paragraph, long enough to keep.</p>\
             </div></body></html>"
        )
    }

    fn source(name: &str, path: &str, target_count: usize) -> Source {
        Source {
            name: name.to_string(),
            url: format!("{SITE}{path}"),
            target_count,
            section_marker: "/opinion/".to_string(),
            base_url: None,
        }
    }

    fn fetcher_with_articles(numbers: impl IntoIterator<Item = usize>) -> MemoryFetcher {
        numbers.into_iter().fold(MemoryFetcher::default(), |f, n| {
            f.with_page(&format!("{SITE}{}", slug(n)), article_page(n))
        })
    }

    fn heuristic_pipeline(fetcher: MemoryFetcher) -> Pipeline<MemoryFetcher, HeuristicFilter> {
        Pipeline::new(
            fetcher,
            HeuristicFilter::new(HeuristicSettings::default()),
            ArticleExtractor::new(&ExtractionSettings::default()).unwrap(),
            5,
        )
    }

    fn urls(digest: &Digest) -> Vec<String> {
        digest.articles.iter().map(|a| a.url.clone()).collect()
    }

    #[tokio::test]
    async fn test_target_count_bounds_articles_in_selection_order() {
        let numbers: Vec<usize> = (1..=10).collect();
        let fetcher = fetcher_with_articles(numbers.clone())
            .with_page(&format!("{SITE}/opinion"), listing(&numbers));
        let pipeline = heuristic_pipeline(fetcher);

        let digest = pipeline.run(&[source("Opinion", "/opinion", 3)]).await;

        assert_eq!(
            urls(&digest),
            vec![
                format!("{SITE}{}", slug(1)),
                format!("{SITE}{}", slug(2)),
                format!("{SITE}{}", slug(3)),
            ]
        );
        let first = &digest.articles[0];
        assert_eq!(first.section, "Opinion");
        assert_eq!(first.title, "Headline 1");
        assert!(first.body.contains("\n\n"));
        assert!(!first.body.contains("Photo"));
        assert_eq!(digest.reports[0].articles_accepted, 3);
        // no article beyond the target was fetched
        assert_eq!(pipeline.fetcher.requests_for(&format!("{SITE}{}", slug(4))), 0);
    }

    #[tokio::test]
    async fn test_cards_linked_twice_still_fill_target() {
        let numbers: Vec<usize> = (1..=20).collect();
        let mut html = String::from("<html><body>");
        for n in &numbers {
            // image link, then headline link, to the same article
            html.push_str(&format!(
                "<div class=\"card\"><a href=\"{0}\"><img src=\"/i/{n}.jpg\"></a><a href=\"{0}\">Headline {n}</a></div>",
                slug(*n)
            ));
        }
        html.push_str("</body></html>");
        let fetcher = fetcher_with_articles(numbers).with_page(&format!("{SITE}/opinion"), html);
        let pipeline = heuristic_pipeline(fetcher);

        let digest = pipeline.run(&[source("Opinion", "/opinion", 10)]).await;

        let titles: Vec<String> = digest.articles.iter().map(|a| a.title.clone()).collect();
        let expected: Vec<String> = (1..=10).map(|n| format!("Headline {n}")).collect();
        assert_eq!(titles, expected);
        assert_eq!(digest.reports[0].duplicates_skipped, 9);
        assert_eq!(pipeline.fetcher.requests_for(&format!("{SITE}{}", slug(11))), 0);
    }

    #[tokio::test]
    async fn test_absolute_and_relative_links_to_same_article_dedup() {
        let relative = "/opinion/column/মতামত-লেখা";
        let absolute = format!("{SITE}{relative}");
        let page = article_page(1);
        let fetcher = MemoryFetcher::default()
            .with_page(
                &format!("{SITE}/opinion"),
                format!(
                    "<a href=\"{absolute}\">The same opinion piece, linked in full</a>\
                     <a href=\"{relative}\">The same opinion piece, linked relatively</a>"
                ),
            )
            .with_page(&normalize(relative, SITE), page);
        let pipeline = heuristic_pipeline(fetcher);

        let digest = pipeline.run(&[source("Opinion", "/opinion", 5)]).await;

        assert_eq!(digest.article_count(), 1);
        assert_eq!(digest.reports[0].duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn test_overlapping_sources_never_duplicate() {
        let fetcher = fetcher_with_articles(1..=6)
            .with_page(&format!("{SITE}/opinion"), listing(&[1, 2, 3, 4]))
            .with_page(&format!("{SITE}/opinion/editorial"), listing(&[2, 3, 5, 6]));
        let pipeline = heuristic_pipeline(fetcher);

        let digest = pipeline
            .run(&[
                source("Opinion", "/opinion", 4),
                source("Editorial", "/opinion/editorial", 2),
            ])
            .await;

        let all = urls(&digest);
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(all.len(), 6);

        let editorial: Vec<&str> = digest
            .articles
            .iter()
            .filter(|a| a.section == "Editorial")
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(editorial, vec!["Headline 5", "Headline 6"]);
        assert_eq!(digest.reports[1].duplicates_skipped, 2);

        for n in 1..=6 {
            assert_eq!(pipeline.fetcher.requests_for(&format!("{SITE}{}", slug(n))), 1);
        }
    }

    #[tokio::test]
    async fn test_unreadable_articles_are_skipped_and_replaced() {
        // article 2 is missing (404), article 3 has no headline
        let fetcher = fetcher_with_articles([1, 4])
            .with_page(
                &format!("{SITE}{}", slug(3)),
                "<div class=\"story-content\"><p>Text without any heading at all, quite long.</p></div>".to_string(),
            )
            .with_page(&format!("{SITE}/opinion"), listing(&[1, 2, 3, 4]));
        let pipeline = heuristic_pipeline(fetcher);

        let digest = pipeline.run(&[source("Opinion", "/opinion", 2)]).await;

        let titles: Vec<&str> = digest.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Headline 1", "Headline 4"]);
        assert_eq!(digest.reports[0].unreadable_skipped, 2);
    }

    #[tokio::test]
    async fn test_failed_url_is_not_extracted_again_by_later_source() {
        let fetcher = MemoryFetcher::default()
            .with_page(&format!("{SITE}/opinion"), listing(&[7]))
            .with_page(&format!("{SITE}/opinion/editorial"), listing(&[7]));
        let pipeline = heuristic_pipeline(fetcher);

        let digest = pipeline
            .run(&[
                source("Opinion", "/opinion", 3),
                source("Editorial", "/opinion/editorial", 3),
            ])
            .await;

        assert!(digest.is_empty());
        assert_eq!(pipeline.fetcher.requests_for(&format!("{SITE}{}", slug(7))), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_diagnostic_digest() {
        let pipeline = heuristic_pipeline(MemoryFetcher::default());

        let digest = pipeline
            .run(&[
                source("Opinion", "/opinion", 10),
                source("Editorial", "/opinion/editorial", 3),
            ])
            .await;

        assert!(digest.is_empty());
        assert_eq!(digest.reports.len(), 2);
        assert!(digest.reports.iter().all(|r| !r.listing_fetched));

        let rendered = render(&digest, &Default::default());
        assert!(rendered.body.starts_with(DIAGNOSTIC_HEADER));
        assert!(rendered.body.contains("listing page could not be fetched"));
    }

    #[tokio::test]
    async fn test_zero_sources_yields_diagnostic_digest() {
        let pipeline = heuristic_pipeline(MemoryFetcher::default());

        let digest = pipeline.run(&[]).await;
        assert!(digest.is_empty());
        assert!(digest.reports.is_empty());
        assert!(render(&digest, &Default::default()).body.starts_with(DIAGNOSTIC_HEADER));
    }

    #[tokio::test]
    async fn test_ai_selector_is_interchangeable() {
        let fetcher = fetcher_with_articles(1..=5).with_page(&format!("{SITE}/opinion"), listing(&[1, 2, 3, 4, 5]));
        let oracle = FixedOracle(
            r#"["/opinion/column/article-number-04-abcdef", "https://news.example/opinion/column/article-number-02-abcdef"]"#,
        );
        let pipeline = Pipeline::new(
            fetcher,
            AiFilter::new(oracle, 60, vec![]),
            ArticleExtractor::new(&ExtractionSettings::default()).unwrap(),
            5,
        );

        let digest = pipeline.run(&[source("Opinion", "/opinion", 3)]).await;
        let titles: Vec<&str> = digest.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Headline 4", "Headline 2"]);
    }

    #[tokio::test]
    async fn test_ai_selector_garbage_response_selects_nothing() {
        let fetcher = fetcher_with_articles(1..=2).with_page(&format!("{SITE}/opinion"), listing(&[1, 2]));
        let pipeline = Pipeline::new(
            fetcher,
            AiFilter::new(FixedOracle("no idea, sorry"), 60, vec![]),
            ArticleExtractor::new(&ExtractionSettings::default()).unwrap(),
            5,
        );

        let digest = pipeline.run(&[source("Opinion", "/opinion", 3)]).await;
        assert!(digest.is_empty());
        assert!(digest.reports[0].listing_fetched);
        assert_eq!(digest.reports[0].urls_selected, 0);
    }
}
