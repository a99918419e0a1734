// src/crawl/mod.rs
// =============================================================================
// This module finds an email address for one website.
//
// Features:
// - Known-path probing (/contact, /about, ...) before anything else
// - Breadth-first crawling with a page budget
// - Stops at the first page that has an email
// - Simple href normalization and asset filtering
//
// Each call owns its own frontier and visited set. Nothing is shared between
// sites, so many crawls can run side by side without locks.
// =============================================================================

mod links;
mod probe;
mod queue;

pub use probe::probe_known_paths;
pub use queue::{crawl_site, CrawlSeed, CrawlStop};
