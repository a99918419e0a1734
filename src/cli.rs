// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Three subcommands:
// - site:  find an email for a single website
// - batch: run a batch job file (same JSON as the API accepts)
// - serve: start the HTTP API
//
// Shared crawl settings (workers, page budget, timeout) are global flags and
// can also come from EMAIL_SCOUT_* environment variables.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    CrawlSettings, DEFAULT_BIND, DEFAULT_MAX_WORKERS, DEFAULT_PAGE_BUDGET, DEFAULT_TIMEOUT_SECS,
};

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "email-scout",
    version,
    about = "Crawl organization websites to find a contact email address",
    long_about = "email-scout visits an organization's homepage and its usual contact pages, \
                  then crawls the site breadth-first until it finds an email address. \
                  Batches of organizations are processed concurrently."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub crawl: CrawlArgs,

    /// Log every page visited (same as RUST_LOG=email_scout=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// Flags that tune every crawl
#[derive(Args, Debug, Clone)]
pub struct CrawlArgs {
    /// How many organizations to crawl at the same time
    #[arg(long, global = true, env = "EMAIL_SCOUT_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Maximum number of pages to crawl per website
    #[arg(long, global = true, env = "EMAIL_SCOUT_PAGE_BUDGET", default_value_t = DEFAULT_PAGE_BUDGET)]
    pub page_budget: usize,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "EMAIL_SCOUT_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl CrawlArgs {
    pub fn settings(&self) -> CrawlSettings {
        CrawlSettings::default()
            .with_max_workers(self.max_workers)
            .with_page_budget(self.page_budget)
            .with_timeout_secs(self.timeout_secs)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find a contact email for one website
    ///
    /// Example: email-scout site https://example.org --page-budget 10
    Site {
        /// Website URL to scan (e.g., https://example.org)
        website_url: String,

        /// Output the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Find contact emails for every organization in a batch job file
    ///
    /// Example: email-scout batch orgs.json --max-workers 20
    Batch {
        /// JSON file shaped like the API request: {"websites": [...]}
        file: PathBuf,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Serve the HTTP API (POST /scrape-emails, GET /health)
    Serve {
        /// Address to listen on
        #[arg(long, env = "EMAIL_SCOUT_BIND", default_value = DEFAULT_BIND)]
        bind: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_command_with_global_flags() {
        let cli = Cli::parse_from(["email-scout", "site", "https://x.org", "--page-budget", "7"]);
        assert_eq!(cli.crawl.page_budget, 7);
        assert!(matches!(cli.command, Commands::Site { ref website_url, json: false } if website_url == "https://x.org"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["email-scout", "batch", "orgs.json"]);
        let settings = cli.crawl.settings();
        assert_eq!(settings.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(settings.page_budget, DEFAULT_PAGE_BUDGET);
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
