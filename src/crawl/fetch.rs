// src/crawl/fetch.rs
// =============================================================================
// Fetches a single page over HTTP.
//
// A response only counts as a page when:
// 1. the status is 2xx (redirects are followed by the client)
// 2. the Content-Type is HTML
// 3. any redirect stayed on the seed's origin
//
// Anything else becomes a FetchError. The scheduler logs it and drops the
// URL; there is no retry.
// =============================================================================

use super::scope::Scope;
use crate::error::FetchError;
use reqwest::{header, Client};
use std::time::Duration;
use url::Url;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched HTML page.
#[derive(Debug)]
pub struct FetchedPage {
    /// URL after redirects. Relative links resolve against this.
    pub final_url: Url,
    pub body: String,
}

// Builds the shared HTTP client
//
// One client is reused by every worker (connection pooling). The timeout
// bounds each request, body included, so a stuck server only ever holds
// one worker slot.
pub fn build_client(timeout: Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(user_agent)
        .build()
}

pub async fn fetch_page(client: &Client, url: &Url, scope: &Scope) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let final_url = response.url().clone();
    if !scope.is_same_origin(&final_url) {
        return Err(FetchError::CrossOriginRedirect {
            from: url.to_string(),
            to: final_url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !is_html(&content_type) {
        return Err(FetchError::NotHtml(content_type));
    }

    let body = response.text().await?;
    Ok(FetchedPage { final_url, body })
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type.to_ascii_lowercase();
    mime.contains("text/html") || mime.contains("application/xhtml+xml")
}
