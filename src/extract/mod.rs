// src/extract/mod.rs
// =============================================================================
// This module turns raw HTML into a page's title, text and links.
//
// The scheduler only talks to the Extractor trait, so the HTML backend can
// be swapped (or faked in tests) without touching the crawl loop.
//
// Submodules:
// - html: the default extractor built on the `scraper` crate
// =============================================================================

mod html;

pub use html::HtmlExtractor;

use url::Url;

/// What an extractor pulls out of one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Document title, or the page URL when there is none.
    pub title: String,
    /// Visible text of the selected content.
    pub content: String,
    /// Every href-bearing anchor as an absolute URL, one per canonical page.
    pub links: Vec<Url>,
}

/// Pluggable HTML extraction.
///
/// Extraction never fails: broken HTML or a selector that matches nothing
/// yields empty content, so one bad page can't stop the crawl.
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str, page_url: &Url) -> Extracted;
}
