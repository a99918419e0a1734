// src/crawl/links.rs
// =============================================================================
// This module turns the raw hrefs of a page into URLs the crawler can queue.
//
// The resolver is deliberately simple:
// - "/path"          -> base URL + "/path"
// - "page.html"      -> current page's directory + "page.html"
// - "https://..."    -> unchanged
//
// It does NOT implement full RFC 3986 resolution ("../" segments, query-only
// or fragment-only hrefs). URLs that come out wrong simply fail to fetch, and
// a failed fetch is never fatal to a crawl.
//
// Before normalization the crawler drops hrefs that point at binary assets
// (PDFs, images, office documents, archives) and hrefs with non-web schemes
// (mailto:, tel:, javascript:) so they don't eat into the page budget.
// =============================================================================

use url::Url;

// Extensions that never lead to an HTML page
const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".rar", ".doc", ".docx", ".xls", ".xlsx",
    ".ppt", ".pptx",
];

// Schemes that can't be fetched with a GET
const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "data:"];

// Resolves an href found on a page into an absolute URL
//
// Parameters:
//   href: the raw href attribute value
//   base_url: scheme + host of the current page ("https://x.com")
//   page_path: the current page URL cut after its last "/"
//
// Pure and total: never fails, always returns a string.
//
// Examples:
//   normalize("/contact", "https://x.com", "https://x.com/about/")
//     -> "https://x.com/contact"
//   normalize("team.html", "https://x.com", "https://x.com/about/")
//     -> "https://x.com/about/team.html"
pub fn normalize(href: &str, base_url: &str, page_path: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base_url, href)
    } else if !href.starts_with("http") {
        format!("{}{}", page_path, href)
    } else {
        href.to_string()
    }
}

// Returns "scheme://host[:port]" for a page URL
//
// An unparseable URL is returned as-is. Such a URL never fetches, so its base
// is never used to resolve links.
pub fn base_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => {
            let mut base = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or_default());
            if let Some(port) = parsed.port() {
                base.push_str(&format!(":{}", port));
            }
            base
        }
        _ => url.to_string(),
    }
}

// Returns the page URL truncated after the last "/", i.e. the "directory"
// relative links resolve against
//
// When the URL has no "/" after the host ("https://x.com") the URL itself is
// returned unchanged.
//
// Examples:
//   "https://x.com/about/team.html" -> "https://x.com/about/"
//   "https://x.com/about/"          -> "https://x.com/about/"
//   "https://x.com"                 -> "https://x.com"
pub fn page_path(url: &str) -> String {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    let rest = &url[after_scheme..];

    // Only the part before any query or fragment counts as the path
    let end = rest.find(|c| c == '?' || c == '#').unwrap_or(rest.len());
    if !rest[..end].contains('/') {
        return url.to_string();
    }

    match url.rfind('/') {
        Some(i) => url[..=i].to_string(),
        None => url.to_string(),
    }
}

// True when the href points at a binary asset (case-insensitive)
pub fn has_skipped_extension(href: &str) -> bool {
    let path = href.split(|c| c == '?' || c == '#').next().unwrap_or(href);
    let path = path.to_ascii_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

// True when an href is worth normalizing and queueing at all
//
// Skips empty and fragment-only hrefs, non-web schemes and binary assets.
pub fn is_followable(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return false;
    }

    !has_skipped_extension(href)
}
