// src/config.rs
// =============================================================================
// Crawl configuration.
//
// CrawlConfig is what the user asked for (plain values, easy to build from
// CLI flags or tests). CrawlConfig::plan() validates it against the seed URL
// and produces a CrawlPlan: the same settings, but with the seed parsed,
// patterns compiled and the selector parsed. Every ConfigError surfaces
// here, before any request is sent.
// =============================================================================

use crate::crawl::scope::{normalize, Scope};
use crate::error::ConfigError;
use crate::extract::HtmlExtractor;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// How many pages may be fetched at the same time.
    pub concurrency: usize,
    /// Glob patterns over URL paths; empty means "everything on the site".
    pub match_patterns: Vec<String>,
    /// CSS selector for the main content; None means the whole <body>.
    pub content_selector: Option<String>,
    /// Stop recording after this many pages.
    pub limit: Option<usize>,
    /// Upper bound for a single request, body included.
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            match_patterns: Vec::new(),
            content_selector: None,
            limit: None,
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("sitefetch/{}", env!("CARGO_PKG_VERSION"))
}

/// A validated, ready-to-run crawl.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub seed: Url,
    pub scope: Scope,
    pub extractor: HtmlExtractor,
    pub concurrency: usize,
    pub limit: Option<usize>,
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

impl CrawlConfig {
    pub fn plan(&self, seed: &str) -> Result<CrawlPlan, ConfigError> {
        let parsed = Url::parse(seed.trim()).map_err(|source| ConfigError::InvalidSeed {
            url: seed.to_string(),
            source,
        })?;
        let scheme = parsed.scheme().to_string();
        let seed = normalize(parsed).ok_or(ConfigError::UnsupportedScheme(scheme))?;

        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.limit == Some(0) {
            return Err(ConfigError::ZeroLimit);
        }

        let scope = Scope::new(&seed, &self.match_patterns)?;
        let extractor = HtmlExtractor::new(self.content_selector.as_deref())?;

        Ok(CrawlPlan {
            seed,
            scope,
            extractor,
            concurrency: self.concurrency,
            limit: self.limit,
            fetch_timeout: self.fetch_timeout,
            user_agent: self.user_agent.clone(),
        })
    }
}
