// src/models.rs
// =============================================================================
// The data that flows in and out of the crawler.
//
// - OrganizationRecord: one row of input (name, website, maybe an email)
// - StatusCode: how we ended up with (or without) an email
// - CrawlResult: one row of output, created once per organization
// - BatchJob: a list of organizations plus per-job overrides
// - BatchSummary: the aggregate counters reported for a whole batch
//
// Everything here is plain data. Inputs are read-only and results are built
// in one go and never mutated afterwards.
// =============================================================================

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::CrawlSettings;

// One organization we want a contact email for.
//
// Accepts both our own lowercase keys and the capitalised keys
// ("Name", "Website", ...) that older clients of the service send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    #[serde(alias = "Name", default = "unknown_name")]
    pub name: String,

    #[serde(alias = "Website", default)]
    pub website: String,

    /// An email we already have; crawling is skipped when present.
    #[serde(
        alias = "Email",
        alias = "knownEmail",
        rename = "email",
        default,
        deserialize_with = "non_empty_string"
    )]
    pub known_email: Option<String>,

    #[serde(alias = "Description", default, deserialize_with = "string_or_null")]
    pub description: String,
}

impl OrganizationRecord {
    pub fn new(name: &str, website: &str) -> Self {
        Self {
            name: name.to_string(),
            website: website.to_string(),
            known_email: None,
            description: String::new(),
        }
    }

    #[cfg(test)]
    pub fn with_known_email(mut self, email: &str) -> Self {
        self.known_email = Some(email.to_string());
        self
    }
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

// `null`, missing and "" all mean "no email on file"
fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

// How the email for an organization was obtained
//
// The tag/content pair turns `Failed("timeout")` into
// {"status": "failed", "reason": "timeout"} when flattened into CrawlResult
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StatusCode {
    /// The input already carried an email, no network activity happened
    AlreadyKnown,
    /// One of the well-known contact paths had an email
    FoundViaKnownPage,
    /// The breadth-first crawl found an email
    FoundViaCrawl,
    /// Every page we were allowed to look at was email-free
    NotFound,
    /// Something went wrong for this organization only
    Failed(String),
}

impl StatusCode {
    pub fn is_failure(&self) -> bool {
        matches!(self, StatusCode::Failed(_))
    }
}

// The outcome for one organization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlResult {
    pub name: String,
    pub website: String,
    pub email: Option<String>,
    pub description: String,
    #[serde(flatten)]
    pub status: StatusCode,
    pub pages_visited: usize,
}

impl CrawlResult {
    pub fn new(
        organization: &OrganizationRecord,
        email: Option<String>,
        status: StatusCode,
        pages_visited: usize,
    ) -> Self {
        Self {
            name: organization.name.clone(),
            website: organization.website.clone(),
            email,
            description: organization.description.clone(),
            status,
            pages_visited,
        }
    }

    pub fn failed(organization: &OrganizationRecord, reason: &str, pages_visited: usize) -> Self {
        Self::new(organization, None, StatusCode::Failed(reason.to_string()), pages_visited)
    }
}

// Aggregate counters for a finished batch.
//
// Always derived from the completed result list, never tracked while the
// batch is running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub results: Vec<CrawlResult>,
    pub total_websites: usize,
    pub processing_time_seconds: f64,
    pub found_emails: usize,
    pub errors: usize,
}

impl BatchSummary {
    pub fn from_results(results: Vec<CrawlResult>, elapsed: std::time::Duration) -> Self {
        let found_emails = results.iter().filter(|r| r.email.is_some()).count();
        let errors = results.iter().filter(|r| r.status.is_failure()).count();

        Self {
            total_websites: results.len(),
            // Two decimals is plenty for a wall-clock figure
            processing_time_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            found_emails,
            errors,
            results,
        }
    }
}

// A batch job, as posted to the API or loaded from a file by the CLI
//
// Example:
//   {"websites": [{"Name": "Acme", "Website": "https://acme.test"}],
//    "max_workers": 4, "max_count": 5}
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchJob {
    pub websites: Vec<OrganizationRecord>,

    #[serde(default, alias = "maxWorkers")]
    pub max_workers: Option<usize>,

    #[serde(default, alias = "max_count", alias = "pageBudget")]
    pub page_budget: Option<usize>,

    /// false processes organizations one at a time
    #[serde(default = "default_concurrent")]
    pub concurrent: bool,
}

fn default_concurrent() -> bool {
    true
}

impl BatchJob {
    // The job's own overrides layered on top of the process-wide settings
    pub fn settings(&self, base: &CrawlSettings) -> CrawlSettings {
        let mut settings = base.clone();
        if let Some(max_workers) = self.max_workers {
            settings = settings.with_max_workers(max_workers);
        }
        if let Some(page_budget) = self.page_budget {
            settings = settings.with_page_budget(page_budget);
        }
        if !self.concurrent {
            settings = settings.with_max_workers(1);
        }
        settings
    }
}
