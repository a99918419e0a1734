// src/extract/email.rs
// =============================================================================
// This module finds email addresses in raw page text.
//
// Three families of patterns are applied to the whole page body:
// 1. Plain addresses:       jane@example.com
// 2. Obfuscated addresses:  jane [at] example [dot] com, jane (at) example.com,
//                           jane at example dot com, jane @ example . com
// 3. mailto: links:         <a href="mailto:jane%40example.com">
//
// Every match is rewritten to the canonical `local@domain.tld` form before it
// goes into the result set. Matching is case-insensitive, but we keep the
// address exactly as the page spelled it.
//
// Rust concepts:
// - regex::Regex: compiled once and reused for every page
// - OnceLock: lazily-initialised statics without any extra crate
// - Newtype structs: EmailSet wraps a Vec and enforces uniqueness
// =============================================================================

use regex::Regex;
use std::sync::OnceLock;

// Local part and domain characters we accept (ASCII only)
const LOCAL: &str = r"[a-z0-9._+\-]+";

// Either bracket style around "dot", or a literal "."
const BRACKETED_DOT: &str = r"(?:\s*[\[(]\s*dot\s*[\])]\s*|\.)";

// Words that turn "look at the dot com bubble" into an address. A bare "at"
// match containing one of these is prose, not an email.
const PROSE_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "be", "by", "for", "from", "here", "him", "her", "his", "in",
    "is", "it", "its", "look", "me", "not", "of", "on", "or", "our", "that", "the", "them",
    "there", "this", "to", "us", "was", "we", "were", "with", "you", "your",
];

// File extensions that look like a TLD in asset names such as "logo@2x.png"
const ASSET_SUFFIXES: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "css", "js",
];

// A set of email addresses found on a page.
//
// Uniqueness is case-insensitive ("Jane@X.com" and "jane@x.com" are one
// entry) and the first spelling seen wins. Entries stay in the order they
// appear in the document, so `first()` is the address nearest the top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSet {
    emails: Vec<String>,
}

impl EmailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address, returning false if an equal one is already present.
    pub fn insert(&mut self, email: &str) -> bool {
        if self.contains(email) {
            return false;
        }
        self.emails.push(email.to_string());
        true
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn first(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }
}

// One obfuscation variant
struct Obfuscation {
    regex: Regex,
    // Bare "at"/"dot" words also occur in ordinary sentences
    prose_prone: bool,
}

// All compiled patterns, built on first use
struct Patterns {
    plain: Regex,
    mailto: Regex,
    obfuscated: Vec<Obfuscation>,
    dot_token: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        plain: compile(&format!(r"(?i){LOCAL}@[a-z0-9.\-]+\.[a-z]+")),
        // Everything up to the first character that cannot be part of an href value
        mailto: compile(r#"(?i)mailto:([^\s"'<>?&#]+)"#),
        obfuscated: vec![
            // jane [at] example [dot] com
            obfuscated(r"\s*\[\s*at\s*\]\s*", BRACKETED_DOT, false),
            // jane (at) example (dot) com
            obfuscated(r"\s*\(\s*at\s*\)\s*", BRACKETED_DOT, false),
            // jane at example dot com
            obfuscated(r"\s+at\s+", r"\s+dot\s+", true),
            // jane @ example . com
            obfuscated(r"\s+@\s+", r"(?:\s+\.\s+|\.)", false),
        ],
        dot_token: compile(r"(?i)\s*[\[(]\s*dot\s*[\])]\s*|\s+dot\s+|\s*\.\s*"),
    })
}

// Builds one obfuscation variant: a local part, an "at" token, then one or
// more domain labels joined by "dot" tokens and a final alphabetic TLD.
fn obfuscated(at: &str, dot: &str, prose_prone: bool) -> Obfuscation {
    Obfuscation {
        regex: compile(&format!(
            r"(?i)\b({LOCAL}){at}((?:[a-z0-9\-]+{dot})+[a-z]{{2,}})\b"
        )),
        prose_prone,
    }
}

// True when the local part or a domain label is an everyday English word
fn reads_as_prose(local: &str, domain: &str) -> bool {
    std::iter::once(local)
        .chain(domain.split('.'))
        .any(|word| PROSE_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)))
}

// The patterns are constants, so failing to compile is a programmer error
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid email pattern {pattern}: {e}"))
}

// Extracts every email address from a page body.
//
// Never fails: a page without addresses simply gives an empty set.
//
// Example:
//   extract("contact me at jane [at] example [dot] com")
//   -> {"jane@example.com"}
pub fn extract(text: &str) -> EmailSet {
    let patterns = patterns();

    // (byte offset, canonical address) from every family, so the final set
    // follows document order no matter which pattern found an address
    let mut found: Vec<(usize, String)> = Vec::new();

    for m in patterns.plain.find_iter(text) {
        if let Some(email) = canonicalize(m.as_str()) {
            found.push((m.start(), email));
        }
    }

    for variant in &patterns.obfuscated {
        for caps in variant.regex.captures_iter(text) {
            let (Some(whole), Some(local), Some(domain)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            let domain = patterns.dot_token.replace_all(domain.as_str(), ".");
            let domain: String = domain.split_whitespace().collect();
            if variant.prose_prone && reads_as_prose(local.as_str(), &domain) {
                continue;
            }
            if let Some(email) = canonicalize(&format!("{}@{}", local.as_str(), domain)) {
                found.push((whole.start(), email));
            }
        }
    }

    for caps in patterns.mailto.captures_iter(text) {
        let Some(target) = caps.get(1) else {
            continue;
        };

        let decoded = percent_decode_address(target.as_str());
        if let Some(m) = patterns.plain.find(&decoded) {
            if let Some(email) = canonicalize(m.as_str()) {
                found.push((target.start(), email));
            }
        }
    }

    // Stable sort keeps plain matches ahead of mailto matches at equal offsets
    found.sort_by_key(|(offset, _)| *offset);

    let mut emails = EmailSet::new();
    for (_, email) in found {
        emails.insert(&email);
    }
    emails
}

// Turns a raw match into `local@domain.tld`, or rejects it.
//
// Strips dots that leaked in from surrounding punctuation
// ("write to jane@example.com.") and drops asset names like "logo@2x.png".
fn canonicalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('.');
    let (local, domain) = trimmed.split_once('@')?;

    let local = local.trim_matches('.');
    let domain = domain.trim_matches('.');
    if local.is_empty() || !domain.contains('.') {
        return None;
    }

    let tld = domain.rsplit('.').next().unwrap_or_default();
    if tld.is_empty() || ASSET_SUFFIXES.iter().any(|s| tld.eq_ignore_ascii_case(s)) {
        return None;
    }

    Some(format!("{}@{}", local, domain))
}

// mailto: targets are URL-encoded now and then ("jane%40example.com")
fn percent_decode_address(value: &str) -> String {
    value
        .replace("%40", "@")
        .replace("%2E", ".")
        .replace("%2e", ".")
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why sort by offset?
//    - Each pattern family is scanned separately
//    - Sorting by where the match started puts the set back in page order
//    - The crawler reports the first address, so order matters
//
// 2. Why is the bare "at" variant strict about "dot"?
//    - Sentences like "look at example.com" are everywhere
//    - Requiring the word "dot" keeps ordinary prose from turning into emails
// -----------------------------------------------------------------------------
