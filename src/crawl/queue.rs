// src/crawl/queue.rs
// =============================================================================
// This module implements the per-site crawl with a breadth-first approach.
//
// How it works:
// 1. Start with the organization's homepage in the frontier
// 2. Pop the oldest URL, fetch it, scan the body for emails
// 3. Found one? Stop right there, nothing else is fetched for this site
// 4. Otherwise queue every new link on the page and go back to 2
// 5. Give up when the frontier is empty or the page budget is spent
//
// Budget accounting:
// - The counter is charged on every dequeue, even for a URL that turns out to
//   be visited already, so the same site and budget always give the same
//   page count.
//
// Failure semantics:
// - A page that fails to fetch is logged and skipped
// - Only cancellation ends the loop without a result
//
// Rust concepts:
// - HashSet: To track visited and queued URLs (O(1) lookup)
// - VecDeque: Double-ended queue for breadth-first crawling
// - tokio::select!: Racing a fetch against a cancellation token
// =============================================================================

use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::links::{base_url, is_followable, normalize, page_path};
use crate::extract::{self, EmailSet};
use crate::fetch::{AnchorParser, Page, PageFetcher};

// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStop {
    /// A page had at least one email
    FoundEmail,
    /// Every reachable URL was tried
    FrontierExhausted,
    /// The page budget ran out first
    BudgetExceeded,
    /// The caller's cancellation token fired
    Cancelled,
}

// What an earlier pass over the same site already fetched
//
// Seeded URLs are never fetched again. A seeded start page has its links
// queued straight away instead of being fetched a second time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlSeed<'a> {
    pub visited: &'a [String],
    pub start_page: Option<&'a Page>,
}

// What one crawl produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCrawl {
    /// Emails from the page that stopped the crawl (empty unless FoundEmail)
    pub emails: EmailSet,
    /// Fetch attempts made by this crawl, successful or not
    pub pages_visited: usize,
    pub stop: CrawlStop,
    /// The page the emails came from
    pub found_on: Option<String>,
}

// The state of one crawl: frontier, visited set and budget counter.
//
// Created at the start of crawl_site and dropped when it returns, so nothing
// ever leaks between organizations.
struct CrawlState {
    frontier: VecDeque<String>,
    // Mirror of `frontier` for O(1) "already queued?" checks
    queued: HashSet<String>,
    visited: HashSet<String>,
    dequeues: usize,
    fetches: usize,
}

impl CrawlState {
    fn new(start_url: &str, seed: CrawlSeed<'_>, parser: &dyn AnchorParser) -> Self {
        let mut state = Self {
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: seed.visited.iter().cloned().collect(),
            dequeues: 0,
            fetches: 0,
        };

        match seed.start_page {
            Some(page) => {
                state.visited.insert(start_url.to_string());
                let queued = state.queue_links(start_url, &page.body, parser);
                debug!(url = %start_url, queued, "reusing fetched start page");
            }
            None => {
                state.enqueue(start_url.to_string());
            }
        }
        state
    }

    // Queue a URL unless it is already waiting or was already visited
    fn enqueue(&mut self, url: String) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.frontier.push_back(url);
        true
    }

    fn pop(&mut self) -> Option<String> {
        let url = self.frontier.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    // Queue every followable link of a page, resolved against that page's URL
    fn queue_links(&mut self, url: &str, body: &str, parser: &dyn AnchorParser) -> usize {
        let base = base_url(url);
        let directory = page_path(url);

        let mut queued = 0;
        for href in parser.parse_anchors(body).into_iter().flatten() {
            if !is_followable(&href) {
                continue;
            }
            if self.enqueue(normalize(&href, &base, &directory)) {
                queued += 1;
            }
        }
        queued
    }

    fn finish(self, stop: CrawlStop, emails: EmailSet, found_on: Option<String>) -> SiteCrawl {
        SiteCrawl {
            emails,
            pages_visited: self.fetches,
            stop,
            found_on,
        }
    }
}

// Crawls one site looking for an email address
//
// Parameters:
//   start_url: where to begin (normally the organization's homepage)
//   page_budget: maximum number of dequeues, and so of pages fetched
//   seed: pages an earlier pass already fetched (CrawlSeed::default() for none)
//   fetcher / parser: the injected network and HTML capabilities
//   cancel: checked between pages and raced against every fetch
//
// Returns: a SiteCrawl describing what was found and why the crawl stopped.
// Never returns an error; individual page failures are logged and skipped.
pub async fn crawl_site(
    start_url: &str,
    page_budget: usize,
    seed: CrawlSeed<'_>,
    fetcher: &dyn PageFetcher,
    parser: &dyn AnchorParser,
    cancel: &CancellationToken,
) -> SiteCrawl {
    let mut state = CrawlState::new(start_url, seed, parser);

    info!(url = %start_url, budget = page_budget, "starting crawl");

    loop {
        if cancel.is_cancelled() {
            info!(url = %start_url, "crawl cancelled");
            return state.finish(CrawlStop::Cancelled, EmailSet::new(), None);
        }

        if state.frontier.is_empty() {
            info!(url = %start_url, pages = state.fetches, "frontier exhausted");
            return state.finish(CrawlStop::FrontierExhausted, EmailSet::new(), None);
        }

        state.dequeues += 1;
        if state.dequeues > page_budget {
            info!(url = %start_url, budget = page_budget, "page budget reached");
            return state.finish(CrawlStop::BudgetExceeded, EmailSet::new(), None);
        }

        let Some(url) = state.pop() else {
            continue;
        };

        // Still charged against the budget above
        if state.visited.contains(&url) {
            continue;
        }
        state.visited.insert(url.clone());
        state.fetches += 1;

        debug!(url = %url, page = state.dequeues, "crawling page");

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(url = %start_url, "crawl cancelled during fetch");
                return state.finish(CrawlStop::Cancelled, EmailSet::new(), None);
            }
            result = fetcher.fetch(&url) => result,
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "failed to fetch page");
                continue;
            }
        };

        let emails = extract::extract(&page.body);
        if !emails.is_empty() {
            info!(url = %url, count = emails.len(), "found email, stopping crawl");
            return state.finish(CrawlStop::FoundEmail, emails, Some(url));
        }

        let queued = state.queue_links(&url, &page.body, parser);
        debug!(url = %page.url, status = page.status, queued, frontier = state.frontier.len(), "queued links");
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why stop at the first email?
//    - One address per organization is all the caller wants
//    - Every extra page costs a request against someone else's server
//
// 2. Why no parallel fetching inside a site?
//    - Breadth-first early stop depends on pages being handled one at a
//      time, in the order they were queued
//    - Parallelism happens one level up, across organizations
//
// 3. Why `biased;` in select!?
//    - Polls the cancellation branch first, so a cancelled crawl never
//      starts (or finishes) one more fetch by luck of the draw
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeFetcher;
    use crate::fetch::{FetchError, HtmlAnchorParser};
    use std::collections::HashMap;
    use std::time::Duration;

    async fn crawl(fetcher: &FakeFetcher, start: &str, budget: usize) -> SiteCrawl {
        crawl_site(
            start,
            budget,
            CrawlSeed::default(),
            fetcher,
            &HtmlAnchorParser,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn test_email_on_homepage_stops_immediately() {
        let fetcher = FakeFetcher::new().page(
            "https://x.com/",
            r#"<p>hello@x.com</p><a href="/about">About</a>"#,
        );

        let result = crawl(&fetcher, "https://x.com/", 5).await;

        assert_eq!(result.stop, CrawlStop::FoundEmail);
        assert_eq!(result.emails.first(), Some("hello@x.com"));
        assert_eq!(result.found_on.as_deref(), Some("https://x.com/"));
        assert_eq!(fetcher.calls(), vec!["https://x.com/"]);
    }

    #[tokio::test]
    async fn test_breadth_first_order_and_early_stop() {
        let fetcher = FakeFetcher::new()
            .page(
                "https://x.com/",
                r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#,
            )
            .page("https://x.com/a", r#"<a href="/deep">Deep</a>"#)
            .page("https://x.com/b", "write to jane [at] x [dot] com")
            .page("https://x.com/c", "never@fetched.com")
            .page("https://x.com/deep", "never@fetched.com");

        let result = crawl(&fetcher, "https://x.com/", 10).await;

        assert_eq!(result.stop, CrawlStop::FoundEmail);
        assert_eq!(result.emails.first(), Some("jane@x.com"));
        assert_eq!(result.pages_visited, 3);
        assert_eq!(
            fetcher.calls(),
            vec!["https://x.com/", "https://x.com/a", "https://x.com/b"]
        );
    }

    #[tokio::test]
    async fn test_each_url_fetched_at_most_once() {
        // Pages link back to each other and to themselves
        let fetcher = FakeFetcher::new()
            .page(
                "https://x.com/",
                r#"<a href="/">Home</a><a href="/a">A</a><a href="/a">A again</a>"#,
            )
            .page("https://x.com/a", r#"<a href="/">Home</a><a href="/b">B</a>"#)
            .page("https://x.com/b", r#"<a href="/a">A</a><a href="https://x.com/">Home</a>"#);

        let result = crawl(&fetcher, "https://x.com/", 50).await;

        assert_eq!(result.stop, CrawlStop::FrontierExhausted);
        assert!(result.emails.is_empty());

        let mut counts: HashMap<String, usize> = HashMap::new();
        for url in fetcher.calls() {
            *counts.entry(url).or_default() += 1;
        }
        assert!(counts.values().all(|&n| n == 1), "duplicate fetch: {:?}", counts);
        assert_eq!(counts.len(), 3);
    }

    #[tokio::test]
    async fn test_budget_bounds_fetches() {
        let mut fetcher = FakeFetcher::new();
        let mut home = String::new();
        for i in 0..20 {
            home.push_str(&format!(r#"<a href="/p{i}">p{i}</a>"#));
            fetcher = fetcher.page(&format!("https://x.com/p{i}"), "nothing here");
        }
        fetcher = fetcher.page("https://x.com/", &home);

        for budget in 0..6 {
            let result = crawl(&fetcher, "https://x.com/", budget).await;
            assert!(result.pages_visited <= budget);
            assert_eq!(result.stop, CrawlStop::BudgetExceeded);
        }

        let result = crawl(&fetcher, "https://x.com/", 4).await;
        assert_eq!(result.pages_visited, 4);
    }

    #[tokio::test]
    async fn test_larger_budget_reaches_deeper_email() {
        let fetcher = FakeFetcher::new()
            .page("https://x.com/", r#"<a href="/a">A</a>"#)
            .page("https://x.com/a", r#"<a href="/b">B</a>"#)
            .page("https://x.com/b", "deep@x.com");

        for budget in 1..3 {
            let result = crawl(&fetcher, "https://x.com/", budget).await;
            assert!(result.emails.is_empty(), "budget {} found too early", budget);
        }
        for budget in 3..6 {
            let result = crawl(&fetcher, "https://x.com/", budget).await;
            assert_eq!(result.emails.first(), Some("deep@x.com"));
        }
    }

    #[tokio::test]
    async fn test_fetch_failures_are_skipped() {
        let fetcher = FakeFetcher::new()
            .page("https://x.com/", r#"<a href="/down">Down</a><a href="/up">Up</a>"#)
            .failing("https://x.com/down", FetchError::Timeout)
            .page("https://x.com/up", "<a href='mailto:team@x.com'>mail</a>");

        let result = crawl(&fetcher, "https://x.com/", 5).await;

        assert_eq!(result.stop, CrawlStop::FoundEmail);
        assert_eq!(result.emails.first(), Some("team@x.com"));
        assert_eq!(fetcher.call_count("https://x.com/down"), 1);
    }

    #[tokio::test]
    async fn test_unreachable_start_exhausts_frontier() {
        let fetcher = FakeFetcher::new();
        let result = crawl(&fetcher, "https://gone.test/", 5).await;

        assert_eq!(result.stop, CrawlStop::FrontierExhausted);
        assert_eq!(result.pages_visited, 1);
    }

    #[tokio::test]
    async fn test_assets_and_mailto_links_are_not_queued() {
        let fetcher = FakeFetcher::new().page(
            "https://x.com/docs/",
            r##"<a href="guide.pdf">PDF</a><a href="/img/LOGO.PNG">Logo</a>
               <a href="#top">Top</a><a href="tel:123">Call</a><a href="faq.html">FAQ</a>"##,
        );

        crawl(&fetcher, "https://x.com/docs/", 10).await;

        assert_eq!(
            fetcher.calls(),
            vec!["https://x.com/docs/", "https://x.com/docs/faq.html"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_crawl_fetches_nothing() {
        let fetcher = FakeFetcher::new().page("https://x.com/", "a@x.com");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = crawl_site(
            "https://x.com/",
            5,
            CrawlSeed::default(),
            &fetcher,
            &HtmlAnchorParser,
            &cancel,
        )
        .await;

        assert_eq!(result.stop, CrawlStop::Cancelled);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_fetch_stops_crawl() {
        let fetcher = FakeFetcher::new()
            .page("https://x.com/", "a@x.com")
            .with_delay(Duration::from_secs(30));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let crawl = crawl_site(
            "https://x.com/",
            5,
            CrawlSeed::default(),
            &fetcher,
            &HtmlAnchorParser,
            &cancel,
        );
        let result = tokio::time::timeout(Duration::from_secs(5), crawl)
            .await
            .expect("crawl kept waiting on the fetch after cancellation");

        assert_eq!(result.stop, CrawlStop::Cancelled);
        assert!(result.emails.is_empty());
        assert_eq!(result.pages_visited, 1);
        assert_eq!(fetcher.calls(), vec!["https://x.com/"]);
    }

    #[tokio::test]
    async fn test_seeded_start_page_is_not_fetched_again() {
        let fetcher = FakeFetcher::new()
            .page("https://x.com/contact", "never@fetched.com")
            .page("https://x.com/people", "chair@x.com");
        let home = Page {
            url: "https://x.com/".to_string(),
            status: 200,
            body: r#"<a href="/contact">Contact</a><a href="/people">People</a>"#.to_string(),
        };
        let visited = vec!["https://x.com/".to_string(), "https://x.com/contact".to_string()];
        let seed = CrawlSeed {
            visited: &visited,
            start_page: Some(&home),
        };

        let result = crawl_site(
            "https://x.com/",
            1,
            seed,
            &fetcher,
            &HtmlAnchorParser,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.stop, CrawlStop::FoundEmail);
        assert_eq!(result.emails.first(), Some("chair@x.com"));
        assert_eq!(result.pages_visited, 1);
        assert_eq!(fetcher.calls(), vec!["https://x.com/people"]);
    }

    #[tokio::test]
    async fn test_seeded_unreachable_start_is_not_retried() {
        let fetcher = FakeFetcher::new();
        let visited = vec!["https://gone.test/".to_string()];
        let seed = CrawlSeed {
            visited: &visited,
            start_page: None,
        };

        let result = crawl_site(
            "https://gone.test/",
            5,
            seed,
            &fetcher,
            &HtmlAnchorParser,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.stop, CrawlStop::FrontierExhausted);
        assert_eq!(result.pages_visited, 0);
        assert!(fetcher.calls().is_empty());
    }
}
