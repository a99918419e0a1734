// src/fetch/html.rs
// =============================================================================
// This module lists the anchor tags of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, so broken markup is repaired rather than rejected
//
// Hrefs are NOT resolved here. The crawler has its own
// normalization rules, so this parser hands back the raw attribute values.
// =============================================================================

use scraper::{Html, Selector};
use std::sync::OnceLock;

use super::AnchorParser;

// Anchor parser backed by scraper/html5ever
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAnchorParser;

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // "a" is a constant, known-good selector
    SELECTOR.get_or_init(|| Selector::parse("a").unwrap_or_else(|e| panic!("bad selector: {e:?}")))
}

impl AnchorParser for HtmlAnchorParser {
    // Returns one entry per <a> element, in document order
    //
    // Example:
    //   html = "<a href='/docs'>Docs</a><a name='top'></a>"
    //   result = [Some("/docs"), None]
    fn parse_anchors(&self, html: &str) -> Vec<Option<String>> {
        let document = Html::parse_document(html);

        document
            .select(anchor_selector())
            .map(|element| element.value().attr("href").map(|href| href.trim().to_string()))
            .collect()
    }
}
