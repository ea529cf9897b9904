// src/crawl/scheduler.rs
// =============================================================================
// The crawl loop.
//
// How it works:
// 1. The seed URL is queued and fetched first, on its own. If the seed can't
//    be fetched there is nothing to crawl, so that is the one fetch failure
//    that ends the crawl with an error.
// 2. `concurrency` workers are spawned. Each one loops:
//      dequeue -> fetch -> extract -> record page -> queue new links -> complete
//    so at most `concurrency` fetches are ever in flight.
// 3. The crawl ends when:
//    - the queue is empty and every worker is idle (Done)
//    - the page limit is reached (LimitReached); fetches already running
//      finish, but their pages are not recorded
//    - the CancellationToken fires (Cancelled); running fetches are
//      abandoned and the pages recorded so far are returned in the error
//
// A failed fetch (HTTP error, timeout, non-HTML...) is logged and the URL is
// dropped. No retries.
//
// Each visit runs on its own task. A panic inside it (a misbehaving
// extractor, say) comes back as a JoinError, so the frontier slot is still
// released and sibling workers don't wait forever.
// =============================================================================

use super::fetch::{build_client, fetch_page};
use super::frontier::{Frontier, Phase, Recorded};
use super::scope::{canonical_key, Scope};
use super::{Page, PageMap};
use crate::config::{CrawlConfig, CrawlPlan};
use crate::error::{CrawlError, FetchError};
use crate::extract::Extractor;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Crawls the site at `seed` and returns every recorded page.
///
/// Cancelling `cancel` stops the crawl early; the partial result comes back
/// as `CrawlError::Cancelled`.
pub async fn fetch_site(
    seed: &str,
    config: &CrawlConfig,
    cancel: CancellationToken,
) -> Result<PageMap, CrawlError> {
    let plan = config.plan(seed)?;
    let crawler = Crawler::from_plan(plan)?;
    crawler.run(cancel).await
}

// Everything a worker needs, shared read-only between all of them
struct Shared {
    client: Client,
    scope: Scope,
    extractor: Arc<dyn Extractor>,
    limit: Option<usize>,
    frontier: Frontier,
}

pub struct Crawler {
    seed: Url,
    concurrency: usize,
    client: Client,
    scope: Scope,
    extractor: Arc<dyn Extractor>,
    limit: Option<usize>,
}

impl Crawler {
    pub fn from_plan(plan: CrawlPlan) -> Result<Self, CrawlError> {
        let client = build_client(plan.fetch_timeout, &plan.user_agent).map_err(CrawlError::Client)?;

        Ok(Self {
            seed: plan.seed,
            concurrency: plan.concurrency,
            client,
            scope: plan.scope,
            extractor: Arc::new(plan.extractor),
            limit: plan.limit,
        })
    }

    /// Replaces the HTML extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<PageMap, CrawlError> {
        let shared = Arc::new(Shared {
            client: self.client,
            scope: self.scope,
            extractor: self.extractor,
            limit: self.limit,
            frontier: Frontier::new(),
        });

        info!("Crawling {} with {} worker(s)", self.seed, self.concurrency);

        // Seed first: its failure is the only fatal fetch error
        shared.frontier.try_enqueue(self.seed.clone()).await;
        if let Some(seed) = shared.frontier.dequeue().await {
            match visit_guarded(&shared, &seed, &cancel).await {
                Visit::Done => {}
                Visit::Abandoned => return Err(cancelled(&shared).await),
                Visit::Failed(source) => {
                    return Err(CrawlError::SeedUnreachable {
                        url: seed.to_string(),
                        source,
                    })
                }
                Visit::Panicked(e) => {
                    return Err(CrawlError::TaskFailed {
                        url: seed.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        }

        // Turns an external cancel into a closed frontier, which wakes every
        // worker waiting in dequeue()
        let watcher = {
            let shared = shared.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                shared.frontier.cancel().await;
            })
        };

        let workers: Vec<_> = (0..self.concurrency)
            .map(|id| {
                let shared = shared.clone();
                let cancel = cancel.clone();
                tokio::spawn(shared.work(id, cancel))
            })
            .collect();

        for result in join_all(workers).await {
            if let Err(e) = result {
                error!("Crawl worker failed: {}", e);
            }
        }
        watcher.abort();

        if cancel.is_cancelled() {
            return Err(cancelled(&shared).await);
        }

        let phase = shared.frontier.phase().await;
        let pages = shared.frontier.take_pages().await;
        info!("Crawl finished ({:?}): {} page(s)", phase, pages.len());
        Ok(pages)
    }
}

// How a single visit ended
enum Visit {
    Done,
    Failed(FetchError),
    Panicked(JoinError),
    Abandoned,
}

// Runs one visit on its own task and always releases its frontier slot
async fn visit_guarded(shared: &Arc<Shared>, url: &Url, cancel: &CancellationToken) -> Visit {
    let mut task = {
        let shared = Arc::clone(shared);
        let url = url.clone();
        tokio::spawn(async move { shared.visit(&url).await })
    };

    let visit = tokio::select! {
        _ = cancel.cancelled() => {
            task.abort();
            Visit::Abandoned
        }
        joined = &mut task => match joined {
            Ok(Ok(())) => Visit::Done,
            Ok(Err(e)) => Visit::Failed(e),
            Err(e) => Visit::Panicked(e),
        },
    };

    shared.frontier.complete().await;
    visit
}

async fn cancelled(shared: &Shared) -> CrawlError {
    shared.frontier.cancel().await;
    let pages = shared.frontier.take_pages().await;
    warn!("Crawl cancelled, keeping {} page(s)", pages.len());
    CrawlError::Cancelled { pages }
}

impl Shared {
    async fn work(self: Arc<Self>, id: usize, cancel: CancellationToken) {
        debug!("Worker {} started", id);

        while let Some(url) = self.frontier.dequeue().await {
            match visit_guarded(&self, &url, &cancel).await {
                Visit::Done => {}
                Visit::Failed(e) => warn!("Skipping {}: {}", url, e),
                Visit::Panicked(e) => error!("Visit of {} failed: {}", url, e),
                Visit::Abandoned => {
                    debug!("Worker {} abandoned {}", id, url);
                    break;
                }
            }
        }

        debug!("Worker {} stopped", id);
    }

    // Fetches one URL, records it and queues the in-scope links it contains
    async fn visit(&self, url: &Url) -> Result<(), FetchError> {
        info!("Fetching {}", url);
        let fetched = fetch_page(&self.client, url, &self.scope).await?;

        let extracted = self.extractor.extract(&fetched.body, &fetched.final_url);

        // The seed is fetched even when it doesn't match, so its links can be
        // followed, but only matching pages are recorded
        if self.scope.matches_patterns(url) {
            let page = Page {
                url: canonical_key(url),
                title: extracted.title,
                content: extracted.content,
            };
            match self.frontier.record_page(page, self.limit).await {
                Recorded::Added => {}
                Recorded::Duplicate => debug!("Already recorded {}", url),
                Recorded::OverLimit => {
                    debug!("Limit reached, discarding {}", url);
                    return Ok(());
                }
            }
        } else {
            debug!("Not recording {} (no pattern matches)", url);
        }

        if self.frontier.phase().await == Phase::LimitReached {
            return Ok(());
        }

        let mut queued = 0;
        for link in extracted.links {
            if !self.scope.contains(&link) {
                continue;
            }
            if self.frontier.try_enqueue(link).await {
                queued += 1;
            }
        }
        if queued > 0 {
            debug!("Queued {} new link(s) from {}", queued, url);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extracted;
    use mockito::{Server, ServerGuard};
    use std::collections::BTreeSet;
    use std::io::Write;
    use std::time::Duration;

    fn html(title: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
            .collect();
        format!(
            "<html><head><title>{}</title></head><body><p>{} body</p>{}</body></html>",
            title, title, anchors
        )
    }

    async fn serve(server: &mut ServerGuard, path: &str, title: &str, links: &[&str]) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(html(title, links))
            .create_async()
            .await
    }

    // A small site:
    //   /          -> /docs, /blog, https://other.example/
    //   /docs      -> /docs/a, /docs/b, /
    //   /docs/a    -> /docs/b
    //   /docs/b    -> /docs/a, /missing
    //   /blog      -> /docs
    //   /missing   -> 500
    async fn site() -> (ServerGuard, Vec<mockito::Mock>) {
        let mut server = Server::new_async().await;
        let mocks = vec![
            serve(&mut server, "/", "Home", &["/docs", "/blog", "https://other.example/"]).await,
            serve(&mut server, "/docs", "Docs", &["/docs/a", "/docs/b#intro", "/"]).await,
            serve(&mut server, "/docs/a", "A", &["/docs/b"]).await,
            serve(&mut server, "/docs/b", "B", &["a", "/missing#frag"]).await,
            serve(&mut server, "/blog", "Blog", &["/docs"]).await,
            server.mock("GET", "/missing").with_status(500).create_async().await,
        ];
        (server, mocks)
    }

    fn paths(pages: &PageMap) -> BTreeSet<String> {
        pages
            .urls()
            .map(|u| Url::parse(u).unwrap().path().to_string())
            .collect()
    }

    async fn crawl(server: &ServerGuard, config: CrawlConfig) -> Result<PageMap, CrawlError> {
        fetch_site(&server.url(), &config, CancellationToken::new()).await
    }

    #[tokio::test]
    async fn test_crawls_whole_site_once_per_page() {
        let (server, mocks) = site().await;
        let pages = crawl(&server, CrawlConfig::default()).await.unwrap();

        let expected: BTreeSet<String> = ["/", "/docs", "/docs/a", "/docs/b", "/blog"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(paths(&pages), expected);

        // Every page was requested exactly once despite the cycles
        for mock in &mocks {
            mock.assert_async().await;
        }

        let docs = pages.get(&format!("{}/docs", server.url())).unwrap();
        assert_eq!(docs.title, "Docs");
        assert!(docs.content.contains("Docs body"));
    }

    #[tokio::test]
    async fn test_server_error_page_is_skipped() {
        let (server, _mocks) = site().await;
        let pages = crawl(&server, CrawlConfig::default()).await.unwrap();
        assert!(!pages.contains(&format!("{}/missing", server.url())));
        assert_eq!(pages.len(), 5);
    }

    #[tokio::test]
    async fn test_limit_is_a_hard_ceiling() {
        let (server, _mocks) = site().await;
        let config = CrawlConfig {
            limit: Some(1),
            concurrency: 4,
            ..Default::default()
        };
        let pages = crawl(&server, config).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages.contains(&format!("{}/", server.url())));
    }

    #[tokio::test]
    async fn test_limit_with_many_workers() {
        let (server, _mocks) = site().await;
        let config = CrawlConfig {
            limit: Some(3),
            concurrency: 8,
            ..Default::default()
        };
        let pages = crawl(&server, config).await.unwrap();
        assert_eq!(pages.len(), 3);
    }

    #[tokio::test]
    async fn test_match_patterns_filter_pages() {
        let (server, _mocks) = site().await;
        let config = CrawlConfig {
            match_patterns: vec!["/docs/**".to_string()],
            ..Default::default()
        };
        let pages = crawl(&server, config).await.unwrap();

        let expected: BTreeSet<String> = ["/docs", "/docs/a", "/docs/b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(paths(&pages), expected);
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_the_result() {
        let (server, _mocks) = site().await;
        let single = crawl(
            &server,
            CrawlConfig {
                concurrency: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let many = crawl(
            &server,
            CrawlConfig {
                concurrency: 6,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(paths(&single), paths(&many));
    }

    #[tokio::test]
    async fn test_cross_origin_links_are_discarded() {
        let mut server = Server::new_async().await;
        let seed = serve(
            &mut server,
            "/",
            "Home",
            &["/one", "/two", "https://elsewhere.example/three"],
        )
        .await;
        let _one = serve(&mut server, "/one", "One", &[]).await;
        let _two = serve(&mut server, "/two", "Two", &[]).await;

        let pages = crawl(&server, CrawlConfig::default()).await.unwrap();
        seed.assert_async().await;
        assert_eq!(pages.len(), 3);
        assert!(pages.urls().all(|u| u.starts_with(&server.url())));
    }

    #[tokio::test]
    async fn test_unreachable_seed_is_fatal() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/").with_status(404).create_async().await;

        let err = crawl(&server, CrawlConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            CrawlError::SeedUnreachable { source: FetchError::Status(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_config_error_before_any_fetch() {
        let err = fetch_site("ftp://example.com", &CrawlConfig::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancel_returns_partial_pages() {
        let mut server = Server::new_async().await;
        let _home = serve(&mut server, "/", "Home", &["/slow"]).await;
        let _slow = server
            .mock("GET", "/slow")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(2));
                w.write_all(b"<p>late</p>")
            })
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let err = fetch_site(&server.url(), &CrawlConfig::default(), cancel)
            .await
            .unwrap_err();
        match err {
            CrawlError::Cancelled { pages } => {
                assert_eq!(pages.len(), 1);
                assert!(pages.contains(&format!("{}/", server.url())));
            }
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_url_is_fetched_with_its_slash() {
        let mut server = Server::new_async().await;
        let _home = serve(&mut server, "/", "Home", &["/docs/"]).await;
        let docs = serve(&mut server, "/docs/", "Docs", &["intro"]).await;
        let bare = server.mock("GET", "/docs").with_status(404).expect(0).create_async().await;
        let intro = serve(&mut server, "/docs/intro", "Intro", &["/docs"]).await;

        let pages = crawl(&server, CrawlConfig::default()).await.unwrap();

        docs.assert_async().await;
        intro.assert_async().await;
        bare.assert_async().await;

        // Pages are keyed by canonical URL, so /docs/ is recorded as /docs
        let expected: BTreeSet<String> = ["/", "/docs", "/docs/intro"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(paths(&pages), expected);
        assert_eq!(pages.get(&format!("{}/docs", server.url())).unwrap().title, "Docs");
    }

    // Panics while extracting one particular path
    struct PanicOn(&'static str);

    impl Extractor for PanicOn {
        fn extract(&self, html: &str, page_url: &Url) -> Extracted {
            if page_url.path() == self.0 {
                panic!("extractor failed on {}", page_url);
            }
            crate::extract::HtmlExtractor::default().extract(html, page_url)
        }
    }

    #[tokio::test]
    async fn test_panicking_visit_does_not_stall_the_crawl() {
        let mut server = Server::new_async().await;
        let _home = serve(&mut server, "/", "Home", &["/boom", "/ok"]).await;
        let _boom = serve(&mut server, "/boom", "Boom", &[]).await;
        let _ok = serve(&mut server, "/ok", "Ok", &[]).await;

        let plan = CrawlConfig {
            concurrency: 2,
            ..Default::default()
        }
        .plan(&server.url())
        .unwrap();
        let crawler = Crawler::from_plan(plan)
            .unwrap()
            .with_extractor(Arc::new(PanicOn("/boom")));

        let pages = tokio::time::timeout(Duration::from_secs(10), crawler.run(CancellationToken::new()))
            .await
            .expect("crawl finished")
            .unwrap();

        let expected: BTreeSet<String> = ["/", "/ok"].iter().map(|s| s.to_string()).collect();
        assert_eq!(paths(&pages), expected);
    }

    #[tokio::test]
    async fn test_panicking_seed_visit_is_an_error() {
        let mut server = Server::new_async().await;
        let _home = serve(&mut server, "/", "Home", &[]).await;

        let plan = CrawlConfig::default().plan(&server.url()).unwrap();
        let crawler = Crawler::from_plan(plan)
            .unwrap()
            .with_extractor(Arc::new(PanicOn("/")));

        let err = crawler.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CrawlError::TaskFailed { .. }));
    }

    struct FixedExtractor;

    impl Extractor for FixedExtractor {
        fn extract(&self, _html: &str, page_url: &Url) -> Extracted {
            Extracted {
                title: "fixed".to_string(),
                content: page_url.path().to_string(),
                links: Vec::new(),
            }
        }
    }

    #[tokio::test]
    async fn test_extractor_is_pluggable() {
        let (server, _mocks) = site().await;
        let plan = CrawlConfig::default().plan(&server.url()).unwrap();
        let crawler = Crawler::from_plan(plan)
            .unwrap()
            .with_extractor(Arc::new(FixedExtractor));

        let pages = crawler.run(CancellationToken::new()).await.unwrap();
        assert_eq!(pages.len(), 1);
        let home = pages.iter().next().unwrap();
        assert_eq!(home.title, "fixed");
        assert_eq!(home.content, "/");
    }
}
