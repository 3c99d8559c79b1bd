//! Depth-bounded concurrent discovery of a site's pages
//!
//! Every node fetches its page, extracts same-host links and spawns one
//! child task per unvisited link. Children are joined before the node
//! returns, so the seed's future resolves to the complete discovered set.

use crate::crawler::parser::extract_links;
use crate::crawler::scheduler::FetchScheduler;
use crate::url::normalize_url;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Discovers the in-domain URLs reachable from a seed
#[derive(Debug, Clone)]
pub struct SiteCrawler {
    scheduler: FetchScheduler,
    max_depth: u32,
}

/// State shared by every node of one crawl
struct CrawlContext {
    scheduler: FetchScheduler,
    max_depth: u32,
    visited: Mutex<HashSet<String>>,
    cancel: CancellationToken,
}

impl CrawlContext {
    /// Marks `url` visited; returns false if another node got there first
    fn claim(&self, url: &str) -> bool {
        self.visited.lock().insert(url.to_string())
    }

    fn is_visited(&self, url: &str) -> bool {
        self.visited.lock().contains(url)
    }
}

impl SiteCrawler {
    pub fn new(scheduler: FetchScheduler, max_depth: u32) -> Self {
        Self {
            scheduler,
            max_depth,
        }
    }

    /// Crawls from `seed` and returns every discovered URL
    ///
    /// The seed itself is always part of the result. Cancelling `cancel`
    /// stops new fetches; whatever was discovered so far is returned.
    ///
    /// # Arguments
    ///
    /// * `seed` - Absolute URL to start from
    /// * `cancel` - Token aborting the traversal
    ///
    /// # Returns
    ///
    /// Normalized absolute URLs (no fragment, no query string)
    pub async fn crawl(&self, seed: &str, cancel: CancellationToken) -> HashSet<String> {
        let seed = match normalize_url(seed) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("Cannot crawl {}: {}", seed, e);
                return HashSet::new();
            }
        };

        let context = Arc::new(CrawlContext {
            scheduler: self.scheduler.clone(),
            max_depth: self.max_depth,
            visited: Mutex::new(HashSet::new()),
            cancel,
        });

        let mut discovered = crawl_node(context.clone(), seed.clone(), 0).await;
        discovered.insert(seed.clone());

        tracing::info!(
            "Discovered {} URLs from {} ({} fetched)",
            discovered.len(),
            seed,
            context.visited.lock().len()
        );

        discovered
    }
}

fn crawl_node(
    context: Arc<CrawlContext>,
    url: String,
    depth: u32,
) -> BoxFuture<'static, HashSet<String>> {
    async move {
        if depth > context.max_depth || context.cancel.is_cancelled() {
            return HashSet::new();
        }
        if !context.claim(&url) {
            return HashSet::new();
        }

        let fetched = tokio::select! {
            _ = context.cancel.cancelled() => return HashSet::new(),
            result = context.scheduler.fetch(&url) => result,
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return HashSet::new();
            }
        };

        let mut found = HashSet::new();
        found.insert(url.clone());

        if !page.is_html() {
            return found;
        }

        let base = match Url::parse(&page.url) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Unparseable final URL {}: {}", page.url, e);
                return found;
            }
        };

        let links = extract_links(&page.body, &base);
        tracing::debug!("{} links on {} (depth {})", links.len(), url, depth);

        if depth < context.max_depth {
            let mut children = JoinSet::new();
            for link in &links {
                if context.is_visited(link) {
                    continue;
                }
                children.spawn(crawl_node(context.clone(), link.clone(), depth + 1));
            }

            while let Some(joined) = children.join_next().await {
                match joined {
                    Ok(child_urls) => found.extend(child_urls),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => tracing::error!("Crawl task under {} panicked: {}", url, e),
                }
            }
        }

        found.extend(links);
        found
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn crawler(max_depth: u32) -> SiteCrawler {
        let config = CrawlerConfig {
            delay_ms: 0,
            max_depth,
            ..CrawlerConfig::default()
        };
        SiteCrawler::new(FetchScheduler::new(&config).unwrap(), max_depth)
    }

    async fn mount_page(server: &MockServer, page_path: &str, body: &str, expected_hits: u64) {
        Mock::given(method("GET"))
            .and(path(page_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.to_string(), "text/html"),
            )
            .expect(expected_hits)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_crawl_visits_each_url_once() {
        let server = MockServer::start().await;
        // Every page links to every other page, including itself.
        let links = r#"<a href="/">home</a><a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#;
        let body = format!("<html><body>{}</body></html>", links);
        for p in ["/", "/a", "/b", "/c"] {
            mount_page(&server, p, &body, 1).await;
        }

        let base = server.uri();
        let urls = crawler(3).crawl(&base, CancellationToken::new()).await;

        assert_eq!(urls.len(), 4);
        assert!(urls.contains(&format!("{}/a", base)));
        assert!(urls.contains(&format!("{}/c", base)));
    }

    #[tokio::test]
    async fn test_crawl_respects_depth_bound() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/d1">1</a>"#, 1).await;
        mount_page(&server, "/d1", r#"<a href="/d2">2</a>"#, 1).await;
        mount_page(&server, "/d2", r#"<a href="/d3">3</a>"#, 0).await;

        let base = server.uri();
        let urls = crawler(1).crawl(&base, CancellationToken::new()).await;

        // /d2 is discovered on /d1 but never fetched.
        assert!(urls.contains(&format!("{}/d1", base)));
        assert!(urls.contains(&format!("{}/d2", base)));
        assert!(!urls.contains(&format!("{}/d3", base)));
    }

    #[tokio::test]
    async fn test_failed_branch_does_not_abort_siblings() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/ok">ok</a><a href="/broken">broken</a>"#, 1).await;
        mount_page(&server, "/ok", r#"<a href="/deep">deep</a>"#, 1).await;
        mount_page(&server, "/deep", "<p>leaf</p>", 1).await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let base = server.uri();
        let urls = crawler(3).crawl(&base, CancellationToken::new()).await;

        assert!(urls.contains(&format!("{}/deep", base)));
        assert!(urls.contains(&format!("{}/broken", base)));
    }

    #[tokio::test]
    async fn test_unreachable_seed_still_returned() {
        let urls = crawler(2)
            .crawl("http://127.0.0.1:1/", CancellationToken::new())
            .await;
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_crawl_returns_without_fetching() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/a">a</a>"#, 0).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let urls = crawler(3).crawl(&server.uri(), cancel).await;
        assert_eq!(urls.len(), 1);
    }
}
