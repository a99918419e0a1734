// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, filtered by RUST_LOG)
// 3. Dispatch to the appropriate subcommand handler
// 4. Print results and exit with a proper code
//    (0 = success, 1 = nothing found / some organizations failed, 2 = error)
// =============================================================================

mod batch;   // src/batch.rs - concurrent processing of many organizations
mod cli;     // src/cli.rs - command-line parsing
mod config;  // src/config.rs - crawl settings and defaults
mod crawl;   // src/crawl/ - known-path probing and breadth-first crawling
mod extract; // src/extract/ - email detection
mod fetch;   // src/fetch/ - HTTP and HTML capabilities
mod models;  // src/models.rs - input records, results, summaries
mod server;  // src/server.rs - HTTP API

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use batch::BatchRunner;
use cli::{Cli, Commands};
use config::CrawlSettings;
use fetch::{HtmlAnchorParser, HttpFetcher};
use models::{BatchJob, BatchSummary, OrganizationRecord, StatusCode};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = cli.crawl.settings();
    let runner = build_runner(&settings)?;

    match cli.command {
        Commands::Site { website_url, json } => {
            handle_site_scan(&runner, &settings, &website_url, json).await
        }
        Commands::Batch { file, json } => handle_batch(&runner, &settings, &file, json).await,
        Commands::Serve { bind } => {
            let state = server::AppState {
                runner,
                settings,
                shutdown: CancellationToken::new(),
            };
            server::serve(&bind, state).await?;
            Ok(0)
        }
    }
}

// RUST_LOG wins when set; otherwise info (or debug with --verbose) for our
// own crate and warnings from everything else
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,email_scout=debug"
    } else {
        "warn,email_scout=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_runner(settings: &CrawlSettings) -> Result<BatchRunner> {
    let fetcher = HttpFetcher::new(settings).context("Failed to create HTTP client")?;
    Ok(BatchRunner::new(Arc::new(fetcher), Arc::new(HtmlAnchorParser)))
}

// Cancels the token on Ctrl+C so unfinished organizations are reported as
// failed instead of silently lost
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling remaining crawls...");
            token.cancel();
        }
    });
    cancel
}

// Handles the 'site' subcommand
//
// Runs the same pipeline as a one-organization batch.
// Returns Ok(0) when an email was found, Ok(1) otherwise.
async fn handle_site_scan(
    runner: &BatchRunner,
    settings: &CrawlSettings,
    website_url: &str,
    json: bool,
) -> Result<i32> {
    println!("🔍 Scanning website: {}", website_url);
    println!("📊 Page budget: {}", settings.page_budget);

    let organization = OrganizationRecord::new(website_url, website_url);
    let summary = runner
        .run(&[organization], settings, &cancel_on_ctrl_c())
        .await;

    let Some(result) = summary.results.first() else {
        return Ok(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        match &result.email {
            Some(email) => println!("✅ {} ({})", email, format_status(&result.status)),
            None => println!("❌ {}", format_status(&result.status)),
        }
        println!("📄 Pages visited: {}", result.pages_visited);
    }

    Ok(if result.email.is_some() { 0 } else { 1 })
}

// Handles the 'batch' subcommand
//
// Returns Ok(1) if any organization failed, Ok(0) otherwise.
async fn handle_batch(
    runner: &BatchRunner,
    settings: &CrawlSettings,
    file: &Path,
    json: bool,
) -> Result<i32> {
    let job = load_job(file).await?;
    let settings = job.settings(settings);

    println!(
        "🔍 Processing {} organization(s) with {} worker(s)",
        job.websites.len(),
        settings.max_workers
    );

    let summary = runner
        .run(&job.websites, &settings, &cancel_on_ctrl_c())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_table(&summary);
    }

    Ok(if summary.errors > 0 { 1 } else { 0 })
}

async fn load_job(file: &Path) -> Result<BatchJob> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid batch job in {}", file.display()))
}

// Prints results as a human-readable table in the terminal
fn print_table(summary: &BatchSummary) {
    println!("{:<30} {:<40} {:<35} {:<20}", "NAME", "WEBSITE", "EMAIL", "STATUS");
    println!("{}", "=".repeat(125));

    for result in &summary.results {
        println!(
            "{:<30} {:<40} {:<35} {:<20}",
            truncate(&result.name, 28),
            truncate(&result.website, 38),
            truncate(result.email.as_deref().unwrap_or("-"), 33),
            format_status(&result.status)
        );
    }

    println!();
    print_summary(summary);
}

fn print_summary(summary: &BatchSummary) {
    println!("📊 Summary:");
    println!("   ✅ Emails: {}", summary.found_emails);
    println!("   ❌ Errors: {}", summary.errors);
    println!("   📋 Total: {}", summary.total_websites);
    println!("   ⏱️  Time: {:.2}s", summary.processing_time_seconds);
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        let cut: String = value.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}

fn format_status(status: &StatusCode) -> String {
    match status {
        StatusCode::AlreadyKnown => "📌 ALREADY KNOWN".to_string(),
        StatusCode::FoundViaKnownPage => "📬 FOUND (KNOWN PAGE)".to_string(),
        StatusCode::FoundViaCrawl => "🕸️  FOUND (CRAWL)".to_string(),
        StatusCode::NotFound => "❔ NOT FOUND".to_string(),
        StatusCode::Failed(reason) => format!("⚠️  FAILED: {}", reason),
    }
}
