// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is a single command:
//
//   sitefetch https://example.com -o site.txt --match '/docs/**' --limit 50
//
// The flags map one-to-one onto CrawlConfig. Range checks (concurrency and
// limit must be at least 1) are left to CrawlConfig::plan() so the CLI and
// library report them the same way.
// =============================================================================

use crate::config::{default_user_agent, CrawlConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "sitefetch",
    version,
    about = "Fetch an entire site and save it as a text file",
    long_about = "sitefetch crawls a website from a starting URL, extracts the text of every page \
                  on the same site and writes it out as plain text or JSON."
)]
pub struct Cli {
    /// URL to start crawling from (prints help when omitted)
    pub url: Option<String>,

    /// Write the fetched site to a file (.json for JSON, anything else for text)
    #[arg(short, long, value_name = "PATH")]
    pub outfile: Option<PathBuf>,

    /// Number of concurrent requests
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Only fetch pages whose path matches this glob (repeatable)
    ///
    /// Example: --match '/docs/**' --match '/blog/*'
    #[arg(short, long = "match", value_name = "PATTERN")]
    pub match_patterns: Vec<String>,

    /// The CSS selector to find the page content
    #[arg(long, value_name = "SELECTOR")]
    pub content_selector: Option<String>,

    /// Limit the result to this amount of pages
    #[arg(long)]
    pub limit: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Do not print any logs
    #[arg(long)]
    pub silent: bool,
}

impl Cli {
    pub fn to_config(&self) -> CrawlConfig {
        CrawlConfig {
            concurrency: self.concurrency,
            match_patterns: self.match_patterns.clone(),
            content_selector: self.content_selector.clone(),
            limit: self.limit,
            fetch_timeout: Duration::from_secs(self.timeout),
            user_agent: default_user_agent(),
        }
    }
}
