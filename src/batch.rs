// src/batch.rs
// =============================================================================
// This module runs the email search for a whole list of organizations.
//
// For every organization:
// 1. Already have an email? Report it, no network activity at all
// 2. Try the known contact paths (/contact, /about, ...)
// 3. Fall back to a breadth-first crawl of the site
//
// Concurrency:
// - One tokio task per organization
// - A semaphore with `max_workers` permits is the admission gate: a task only
//   starts fetching once it holds a permit and gives it back when it's done
// - Each task owns its crawl state, so nothing else needs a lock
//
// Page budget:
// - Shared by the prober and the crawler: the crawler only gets what the
//   known paths left over, and never refetches a URL the prober tried
// - `pages_visited` is the total number of fetches for the site
//
// Failure isolation:
// - A panic or cancellation inside one organization's task becomes a
//   `Failed(reason)` result for that organization only
// - Results come back in input order, whatever order the tasks finish in
// =============================================================================

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::CrawlSettings;
use crate::crawl::{crawl_site, probe_known_paths, CrawlSeed, CrawlStop};
use crate::fetch::{AnchorParser, PageFetcher};
use crate::models::{BatchSummary, CrawlResult, OrganizationRecord, StatusCode};

const CANCELLED: &str = "cancelled";

// Runs batches against one fetcher/parser pair
//
// Cheap to clone: both capabilities sit behind Arcs and are shared by every
// task the runner spawns.
#[derive(Clone)]
pub struct BatchRunner {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn AnchorParser>,
}

impl BatchRunner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: Arc<dyn AnchorParser>) -> Self {
        Self { fetcher, parser }
    }

    // Processes every organization and returns one result per input, in
    // input order
    //
    // At most `settings.max_workers` organizations are crawled at once, and
    // each crawl fetches at most `settings.page_budget` pages.
    pub async fn process_batch(
        &self,
        organizations: &[OrganizationRecord],
        settings: &CrawlSettings,
        cancel: &CancellationToken,
    ) -> Vec<CrawlResult> {
        let gate = Arc::new(Semaphore::new(settings.max_workers.max(1)));
        let page_budget = settings.page_budget;

        info!(
            organizations = organizations.len(),
            max_workers = settings.max_workers,
            page_budget,
            "starting batch"
        );

        let handles = organizations.iter().cloned().map(|organization| {
            let runner = self.clone();
            let gate = Arc::clone(&gate);
            let cancel = cancel.clone();

            tokio::spawn(async move {
                // No network activity, so no permit needed
                if let Some(email) = &organization.known_email {
                    info!(organization = %organization.name, "email already known");
                    return CrawlResult::new(
                        &organization,
                        Some(email.clone()),
                        StatusCode::AlreadyKnown,
                        0,
                    );
                }

                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = gate.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return CrawlResult::failed(&organization, CANCELLED, 0);
                };

                runner.process_organization(&organization, page_budget, &cancel).await
            })
        });

        // join_all keeps the handles' order, which is the input order
        let joined = join_all(handles).await;

        joined
            .into_iter()
            .zip(organizations)
            .map(|(outcome, organization)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    let reason = describe_join_error(e);
                    error!(organization = %organization.name, error = %reason, "organization task failed");
                    CrawlResult::failed(organization, &reason, 0)
                }
            })
            .collect()
    }

    // Same as process_batch, plus the aggregate counters and wall time
    pub async fn run(
        &self,
        organizations: &[OrganizationRecord],
        settings: &CrawlSettings,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let started = Instant::now();
        let results = self.process_batch(organizations, settings, cancel).await;
        let summary = BatchSummary::from_results(results, started.elapsed());

        info!(
            total = summary.total_websites,
            found = summary.found_emails,
            errors = summary.errors,
            seconds = summary.processing_time_seconds,
            "batch complete"
        );

        summary
    }

    // Prober first, crawler second, for an organization without an email
    async fn process_organization(
        &self,
        organization: &OrganizationRecord,
        page_budget: usize,
        cancel: &CancellationToken,
    ) -> CrawlResult {
        let website = organization.website.as_str();

        let probe = probe_known_paths(website, page_budget, self.fetcher.as_ref(), cancel).await;
        if probe.cancelled {
            return CrawlResult::failed(organization, CANCELLED, probe.pages_visited());
        }
        if let Some(email) = probe.emails.first() {
            info!(
                organization = %organization.name,
                email = %email,
                page = probe.found_on.as_deref().unwrap_or(website),
                "found via known page"
            );
            return CrawlResult::new(
                organization,
                Some(email.to_string()),
                StatusCode::FoundViaKnownPage,
                probe.pages_visited(),
            );
        }

        let remaining = page_budget.saturating_sub(probe.pages_visited());
        let seed = CrawlSeed {
            visited: &probe.attempted,
            start_page: probe.homepage.as_ref(),
        };
        let crawl = crawl_site(
            website,
            remaining,
            seed,
            self.fetcher.as_ref(),
            self.parser.as_ref(),
            cancel,
        )
        .await;
        let pages_visited = probe.pages_visited() + crawl.pages_visited;

        match (crawl.stop, crawl.emails.first()) {
            (CrawlStop::Cancelled, _) => CrawlResult::failed(organization, CANCELLED, pages_visited),
            (_, Some(email)) => {
                info!(
                    organization = %organization.name,
                    email = %email,
                    page = crawl.found_on.as_deref().unwrap_or(website),
                    "found via crawl"
                );
                CrawlResult::new(
                    organization,
                    Some(email.to_string()),
                    StatusCode::FoundViaCrawl,
                    pages_visited,
                )
            }
            (_, None) => {
                info!(organization = %organization.name, pages = pages_visited, "no email found");
                CrawlResult::new(organization, None, StatusCode::NotFound, pages_visited)
            }
        }
    }
}

// Turns a task failure (panic or abort) into a readable reason
fn describe_join_error(error: JoinError) -> String {
    if error.is_cancelled() {
        return CANCELLED.to_string();
    }

    match error.try_into_panic() {
        Ok(payload) => {
            if let Some(message) = payload.downcast_ref::<&str>() {
                format!("panic: {}", message)
            } else if let Some(message) = payload.downcast_ref::<String>() {
                format!("panic: {}", message)
            } else {
                "panic".to_string()
            }
        }
        Err(e) => e.to_string(),
    }
}
