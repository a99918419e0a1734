// src/config.rs
// =============================================================================
// Crawl settings shared by the CLI, the batch runner and the HTTP API.
//
// Defaults:
// - 10 organizations crawled at the same time
// - 5 pages per site
// - 3 second timeout per request
//
// CLI flags (and their EMAIL_SCOUT_* environment variables) override these,
// and a batch job request can override workers and budget per job.
// =============================================================================

use std::time::Duration;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_PAGE_BUDGET: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

const USER_AGENT: &str = concat!("email-scout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Ceiling on organizations crawled concurrently
    pub max_workers: usize,
    /// Maximum pages fetched per site (prober + crawler)
    pub page_budget: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            page_budget: DEFAULT_PAGE_BUDGET,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl CrawlSettings {
    // A worker ceiling of zero would deadlock the admission gate, so it is
    // clamped to one
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_page_budget(mut self, page_budget: usize) -> Self {
        self.page_budget = page_budget;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs.max(1));
        self
    }
}
