// src/fetch/mod.rs
// =============================================================================
// The two capabilities the crawler needs from the outside world.
//
// - PageFetcher: GET a URL and hand back status + body, or a FetchError
// - AnchorParser: list the hrefs of the <a> tags in an HTML body
//
// The crawler only ever talks to these traits. Production code plugs in the
// reqwest/scraper implementations below; tests plug in scripted fakes so no
// test touches the network.
// =============================================================================

mod html;
mod http;

use async_trait::async_trait;

pub use html::HtmlAnchorParser;
pub use http::{FetchError, HttpFetcher};

// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// The URL the body came from (after redirects)
    pub url: String,
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a single page. Non-2xx answers must come back as
    /// `FetchError::Status`, not as an Ok page.
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

pub trait AnchorParser: Send + Sync {
    /// One entry per anchor element; `None` when it has no href.
    /// Must tolerate malformed markup without failing.
    fn parse_anchors(&self, html: &str) -> Vec<Option<String>>;
}

// Scripted stand-ins used by the crawler, prober and batch tests
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // A fetcher that serves canned pages from memory.
    //
    // Unknown URLs answer 404. Every call is counted per URL, and the peak
    // number of fetches running at the same moment is recorded.
    #[derive(Default)]
    pub struct FakeFetcher {
        pages: HashMap<String, Result<String, FetchError>>,
        calls: Mutex<Vec<String>>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn failing(mut self, url: &str, error: FetchError) -> Self {
            self.pages.insert(url.to_string(), Err(error));
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }

        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.pages.get(url) {
                Some(Ok(body)) => Ok(Page {
                    url: url.to_string(),
                    status: 200,
                    body: body.clone(),
                }),
                Some(Err(e)) => Err(e.clone()),
                None => Err(FetchError::Status(404)),
            }
        }
    }
}
