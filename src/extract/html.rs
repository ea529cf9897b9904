// src/extract/html.rs
// =============================================================================
// Extracts title, visible text and links from HTML using `scraper`.
//
// Visible text means: every text node below the chosen root, except those
// inside script/style/noscript/template. Block elements (p, div, li, h1...)
// start a new paragraph so the output keeps some shape.
//
// The root is either:
// - every element matching the content selector, joined by blank lines
// - or <body> when no selector is configured
// =============================================================================

use super::{Extracted, Extractor};
use crate::crawl::scope::{canonical_key, resolve};
use crate::error::ConfigError;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

// These selectors are constants known to be valid
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("static selector"));
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("static selector"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static BASE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("base[href]").expect("static selector"));

// Elements whose text is never shown to a reader
const HIDDEN: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

// Elements that break the text flow
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tr", "ul",
];

#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor {
    content: Option<Selector>,
}

impl HtmlExtractor {
    /// Builds an extractor, validating the optional CSS content selector.
    pub fn new(content_selector: Option<&str>) -> Result<Self, ConfigError> {
        let content = match content_selector.map(str::trim) {
            None | Some("") => None,
            Some(sel) => Some(Selector::parse(sel).map_err(|e| ConfigError::InvalidSelector {
                selector: sel.to_string(),
                reason: format!("{:?}", e),
            })?),
        };
        Ok(Self { content })
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Extracted {
        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!("{} parse error(s) in {}", document.errors.len(), page_url);
        }

        let title = extract_title(&document).unwrap_or_else(|| page_url.to_string());

        let content = match &self.content {
            Some(selector) => {
                let blocks: Vec<String> = document
                    .select(selector)
                    .map(visible_text)
                    .filter(|text| !text.is_empty())
                    .collect();
                if blocks.is_empty() {
                    debug!("Content selector matched nothing on {}", page_url);
                }
                blocks.join("\n\n")
            }
            None => document.select(&BODY).next().map(visible_text).unwrap_or_default(),
        };

        let links = extract_links(&document, page_url);

        Extracted { title, content, links }
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let raw: String = document.select(&TITLE).next()?.text().collect();
    let title = collapse_spaces(&raw);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

// Collects absolute link targets in document order, one per canonical page
fn extract_links(document: &Html, page_url: &Url) -> Vec<Url> {
    // <base href> changes what relative links resolve against
    let base = document
        .select(&BASE)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .unwrap_or_else(|| page_url.clone());

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHORS) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(url) = resolve(&base, href) {
            if seen.insert(canonical_key(&url)) {
                links.push(url);
            }
        }
    }

    links
}

fn visible_text(root: ElementRef) -> String {
    let mut raw = String::new();
    collect_text(root, &mut raw);
    tidy_lines(&raw)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                // Source formatting newlines are not line breaks
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let is_block = BLOCKS.contains(&name);
                if is_block {
                    out.push('\n');
                }
                collect_text(child_ref, out);
                if is_block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

// Collapses spaces on each line and keeps at most one blank line between
// paragraphs
fn tidy_lines(raw: &str) -> String {
    let mut out = String::new();
    let mut gap = false;

    for line in raw.lines() {
        let line = collapse_spaces(line);
        if line.is_empty() {
            gap = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if gap { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        gap = false;
    }

    out
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
