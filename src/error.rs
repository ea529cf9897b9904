// src/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// Only two kinds of error ever reach the caller:
// - ConfigError: the crawl was set up wrong (bad seed URL, zero concurrency,
//   broken selector). Raised before a single request is made.
// - CrawlError: the crawl as a whole failed or was cancelled.
//
// FetchError is per-URL. The scheduler logs it and moves on; it only becomes
// fatal when the seed URL itself cannot be fetched.
//
// main.rs wraps all of these in anyhow::Error, the same way it wraps any
// other failure.
// =============================================================================

use crate::crawl::PageMap;
use thiserror::Error;

/// Problems with the crawl configuration, caught before any fetch starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid seed URL '{url}': {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme '{0}' (only http and https can be crawled)")]
    UnsupportedScheme(String),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("limit must be at least 1")]
    ZeroLimit,

    #[error("invalid match pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid content selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Why a single page could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("request timed out")]
    Timeout,

    #[error("not an HTML page (content-type: {0})")]
    NotHtml(String),

    #[error("redirected off-site from {from} to {to}")]
    CrossOriginRedirect { from: String, to: String },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(error)
        }
    }
}

/// Terminal outcome of a crawl that did not finish normally.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("seed URL {url} is unreachable: {source}")]
    SeedUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("crawl task for {url} failed: {reason}")]
    TaskFailed { url: String, reason: String },

    /// The caller aborted the crawl. Whatever was recorded so far is kept.
    #[error("crawl cancelled after {} page(s)", .pages.len())]
    Cancelled { pages: PageMap },
}
