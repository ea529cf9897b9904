// src/lib.rs
// =============================================================================
// sitefetch: crawl a website and collect the text of every page.
//
// The binary (src/main.rs) is a thin wrapper; everything it does is
// available here so other programs can run a crawl directly:
//
//   let pages = sitefetch::crawl::fetch_site(
//       "https://example.com",
//       &sitefetch::config::CrawlConfig::default(),
//       tokio_util::sync::CancellationToken::new(),
//   ).await?;
//
// Modules:
// - config: crawl settings and their validation
// - crawl: scope matching, frontier, fetching and the worker pool
// - extract: HTML to title/text/links
// - output: text and JSON rendering
// - error: error types
// - cli: command-line flags
// =============================================================================

pub mod cli;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod output;
