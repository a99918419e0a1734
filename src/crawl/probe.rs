// src/crawl/probe.rs
// =============================================================================
// This module tries the pages where contact details usually live before we
// fall back to a full crawl.
//
// Most organizations put an address on the homepage, /contact or /about.
// Checking those few URLs directly is cheaper than a breadth-first crawl and
// finds the same address most of the time.
// =============================================================================

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::extract::{self, EmailSet};
use crate::fetch::{Page, PageFetcher};

// Tried in this order; "" is the homepage itself
pub const KNOWN_PATHS: &[&str] = &[
    "",
    "/contact",
    "/contact-us",
    "/about",
    "/about-us",
    "/team",
    "/faculty",
    "/directory",
    "/staff",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub emails: EmailSet,
    /// Every URL fetched (or attempted), in order
    pub attempted: Vec<String>,
    pub found_on: Option<String>,
    /// The homepage, when it loaded but had no address
    pub homepage: Option<Page>,
    pub cancelled: bool,
}

impl ProbeResult {
    fn new() -> Self {
        Self {
            emails: EmailSet::new(),
            attempted: Vec::new(),
            found_on: None,
            homepage: None,
            cancelled: false,
        }
    }

    pub fn pages_visited(&self) -> usize {
        self.attempted.len()
    }
}

// Fetches website + suffix for each known path until one page has an email
//
// At most `page_budget` paths are fetched; whatever is left over goes to the
// crawler. Never fails: a path that can't be fetched is skipped and the next
// one is tried. Returns an empty set when no candidate has an address.
pub async fn probe_known_paths(
    website: &str,
    page_budget: usize,
    fetcher: &dyn PageFetcher,
    cancel: &CancellationToken,
) -> ProbeResult {
    let base = website.trim_end_matches('/');
    let mut result = ProbeResult::new();

    for suffix in KNOWN_PATHS {
        if result.pages_visited() >= page_budget {
            debug!(url = %website, budget = page_budget, "page budget spent on known paths");
            break;
        }

        let url = if suffix.is_empty() {
            website.to_string()
        } else {
            format!("{}{}", base, suffix)
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = fetcher.fetch(&url) => Some(outcome),
        };
        let Some(fetched) = fetched else {
            result.cancelled = true;
            return result;
        };
        result.attempted.push(url.clone());

        match fetched {
            Ok(page) => {
                let emails = extract::extract(&page.body);
                if !emails.is_empty() {
                    info!(url = %url, count = emails.len(), "found email on known path");
                    result.emails = emails;
                    result.found_on = Some(url);
                    return result;
                }
                if suffix.is_empty() {
                    result.homepage = Some(page);
                }
            }
            Err(e) => debug!(url = %url, error = %e, "known path unavailable"),
        }
    }

    result
}
