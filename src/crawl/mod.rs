// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Concurrent crawling with a fixed-size worker pool
// - Same-origin restriction (never leaves the seed's scheme+host+port)
// - Optional glob patterns to restrict which paths are crawled
// - Optional page limit and external cancellation
//
// Submodules:
// - scope: canonical URLs and the crawl scope
// - fetch: HTTP GET with the checks a page must pass
// - frontier: shared crawl state (queue, seen set, recorded pages)
// - scheduler: the worker pool that drives everything
// =============================================================================

mod fetch;
mod frontier;
mod scheduler;
pub mod scope;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use frontier::{Frontier, Phase, Recorded};
pub use scheduler::{fetch_site, Crawler};

/// One crawled page. Identity is its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// Canonical URL -> Page, kept in the order pages were recorded.
///
/// Under concurrency that order is nondeterministic; use `sorted()` when
/// a stable order matters.
#[derive(Debug, Clone, Default)]
pub struct PageMap {
    pages: Vec<Page>,
    index: HashMap<String, usize>,
}

impl PageMap {
    /// Inserts a page unless its URL is already present.
    /// Returns whether the page was added.
    pub fn insert(&mut self, page: Page) -> bool {
        if self.index.contains_key(&page.url) {
            return false;
        }
        self.index.insert(page.url.clone(), self.pages.len());
        self.pages.push(page);
        true
    }

    pub fn get(&self, url: &str) -> Option<&Page> {
        self.index.get(url).map(|&i| &self.pages[i])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.url.as_str())
    }

    /// Pages ordered by URL.
    pub fn sorted(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.iter().collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        pages
    }
}

impl FromIterator<Page> for PageMap {
    fn from_iter<I: IntoIterator<Item = Page>>(iter: I) -> Self {
        let mut map = PageMap::default();
        for page in iter {
            map.insert(page);
        }
        map
    }
}
