//! Feed polling and per-article orchestration.
//!
//! One [`Crawler`] owns the HTTP client, the extraction pipeline and the
//! publisher for the life of the process. A cycle walks the feed list
//! serially:
//!
//! 1. **Indexing**: fetch the feed and list its entry links
//! 2. **Fetching**: download each entry's page (bounded by the client timeout)
//! 3. **Extraction**: run the page through the [`Pipeline`]
//! 4. **Publishing**: hand the article to the publisher and await the ack
//!
//! Failures are contained at the smallest unit: a bad feed skips that feed,
//! a bad page or failed publish skips that article. Nothing is retried
//! until the next cycle.

pub mod feeds;
pub mod fetch;

use crate::extract::Pipeline;
use crate::extract::assembler::ArticleOrigin;
use crate::extract::isolator::{ContentExtractor, ReadabilityExtractor};
use crate::models::FeedSource;
use crate::outputs::Publisher;
use feeds::index_feed;
use fetch::fetch_page;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Which feeds a cycle covers and how many entries it takes from each.
#[derive(Debug, Clone, Default)]
pub struct CrawlScope {
    /// Only feeds of this category, when set.
    pub category: Option<i64>,
    /// At most this many entries per feed, when set.
    pub limit: Option<usize>,
}

impl CrawlScope {
    fn includes(&self, feed: &FeedSource) -> bool {
        self.category.is_none_or(|c| c == feed.category_id)
    }
}

/// Counters for one crawl cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub feeds: usize,
    pub entries: usize,
    pub published: usize,
    pub failed: usize,
}

/// What happened to a single feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Published,
    Skipped,
    Failed,
}

/// The crawl orchestrator.
///
/// Built once at startup and kept for the life of the process: the client's
/// connection pool and the publisher's broker connection are reused across
/// every cycle and released when the crawler is dropped.
pub struct Crawler<P, E = ReadabilityExtractor> {
    client: Client,
    pipeline: Pipeline<E>,
    publisher: P,
    feeds: Vec<FeedSource>,
    scope: CrawlScope,
}

impl<P: Publisher, E: ContentExtractor> Crawler<P, E> {
    /// A crawler over the built-in feed list with an unrestricted scope.
    pub fn new(client: Client, pipeline: Pipeline<E>, publisher: P) -> Self {
        Self {
            client,
            pipeline,
            publisher,
            feeds: feeds::FEEDS.to_vec(),
            scope: CrawlScope::default(),
        }
    }

    /// Replace the feed list.
    #[cfg(test)]
    pub fn with_feeds(mut self, feeds: Vec<FeedSource>) -> Self {
        self.feeds = feeds;
        self
    }

    /// Restrict which feeds and how many entries a cycle covers.
    pub fn with_scope(mut self, scope: CrawlScope) -> Self {
        self.scope = scope;
        self
    }

    /// Poll every feed once.
    #[instrument(level = "info", skip_all)]
    pub async fn run_once(&self) -> CycleStats {
        let mut stats = CycleStats::default();
        for feed in self.feeds.iter().filter(|f| self.scope.includes(f)) {
            stats.feeds += 1;
            let links = match index_feed(&self.client, feed).await {
                Ok(links) => links,
                Err(e) => {
                    error!(feed = feed.url, error = %e, "Feed fetch failed; skipping feed");
                    continue;
                }
            };

            let take = self.scope.limit.unwrap_or(usize::MAX);
            for link in links.iter().take(take) {
                stats.entries += 1;
                match self.process_entry(feed, link).await {
                    EntryOutcome::Published => stats.published += 1,
                    EntryOutcome::Failed => stats.failed += 1,
                    EntryOutcome::Skipped => {}
                }
            }
        }

        info!(
            feeds = stats.feeds,
            entries = stats.entries,
            published = stats.published,
            failed = stats.failed,
            "Crawl cycle complete"
        );
        stats
    }

    /// Fetch, extract and publish one entry. Never fails the caller.
    #[instrument(level = "info", skip_all, fields(url = %link))]
    pub async fn process_entry(&self, feed: &FeedSource, link: &str) -> EntryOutcome {
        let page = match fetch_page(&self.client, link).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "Article fetch failed; skipping");
                return EntryOutcome::Failed;
            }
        };

        let origin = ArticleOrigin {
            source_url: link,
            category_id: feed.category_id,
            source_name: feed.source_name,
        };
        let Some(article) = self.pipeline.process(&page, origin) else {
            return EntryOutcome::Skipped;
        };

        match self.publisher.publish(&article).await {
            Ok(()) => {
                info!(
                    title = %article.title,
                    chars = article.plain_text().chars().count(),
                    cover = ?article.cover_image,
                    "[SEND] Published article"
                );
                EntryOutcome::Published
            }
            Err(e) => {
                error!(title = %article.title, error = %e, "Publish failed; continuing");
                EntryOutcome::Failed
            }
        }
    }

    /// Run cycles forever, sleeping `interval` between them, until Ctrl-C.
    ///
    /// A Ctrl-C during a cycle lets that cycle finish first, so no article
    /// is abandoned between fetch and publish.
    pub async fn run_loop(&self, interval: Duration) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C; loop runs until killed");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(interval, ctrl_c).await;
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// `shutdown` is polled for the whole life of the loop, during cycles as
    /// well as during the sleep between them.
    ///
    /// # Arguments
    ///
    /// * `interval` - Pause between the end of one cycle and the next
    /// * `shutdown` - Resolves when the loop should stop
    ///
    /// # Returns
    ///
    /// The number of cycles that ran to completion.
    pub async fn run_until<F>(&self, interval: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        info!(interval_secs = interval.as_secs(), "Crawler loop starting");
        tokio::pin!(shutdown);
        let mut stopping = false;
        let mut cycles = 0;

        loop {
            let cycle = self.run_once();
            tokio::pin!(cycle);
            loop {
                tokio::select! {
                    _ = &mut cycle => break,
                    _ = &mut shutdown, if !stopping => {
                        info!("Shutdown requested; finishing current cycle");
                        stopping = true;
                    }
                }
            }
            cycles += 1;
            if stopping {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        info!(cycles, "Leaving crawler loop");
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CrawlError, Result};
    use crate::extract::isolator::RawExtraction;
    use crate::models::Article;
    use crate::rules::CompiledRules;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Treats the whole document as the article body.
    struct WholePage;

    impl ContentExtractor for WholePage {
        fn extract(&self, html: &str, _url: &str) -> Option<RawExtraction> {
            Some(RawExtraction {
                content_html: html.to_string(),
                text: html.to_string(),
                title: Some("测试".to_string()),
                published: None,
            })
        }
    }

    #[derive(Default)]
    struct Recording {
        articles: Mutex<Vec<Article>>,
        fail: bool,
    }

    impl Publisher for Recording {
        async fn publish(&self, article: &Article) -> Result<()> {
            if self.fail {
                return Err(CrawlError::Publish("broker down".to_string()));
            }
            self.articles.lock().unwrap().push(article.clone());
            Ok(())
        }
    }

    fn long_page() -> String {
        let p = format!("<p>{}</p>", "今天天气很好，".repeat(10));
        format!("<html><body>{}</body></html>", p.repeat(6))
    }

    async fn serve(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn setup() -> (MockServer, FeedSource) {
        let server = MockServer::start().await;
        let rss = format!(
            "<rss version=\"2.0\"><channel><title>t</title>\
             <item><link>{0}/a.html</link></item>\
             <item><link>{0}/short.html</link></item>\
             <item><link>{0}/missing.html</link></item>\
             </channel></rss>",
            server.uri()
        );
        serve(&server, "/feed.xml", rss).await;
        serve(&server, "/a.html", long_page()).await;
        serve(&server, "/short.html", "<html><body><p>短</p></body></html>".to_string()).await;
        Mock::given(method("GET"))
            .and(path("/missing.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url: &'static str = Box::leak(format!("{}/feed.xml", server.uri()).into_boxed_str());
        let feed = FeedSource {
            url,
            category_id: 4,
            source_name: "中国新闻网",
        };
        (server, feed)
    }

    fn crawler(publisher: Recording, feed: FeedSource) -> Crawler<Recording, WholePage> {
        let client = fetch::build_client(Duration::from_secs(5)).unwrap();
        let pipeline = Pipeline::new(WholePage, CompiledRules::default());
        Crawler::new(client, pipeline, publisher).with_feeds(vec![feed])
    }

    #[tokio::test]
    async fn test_cycle_publishes_and_skips() {
        let (server, feed) = setup().await;
        let crawler = crawler(Recording::default(), feed);

        let stats = crawler.run_once().await;
        assert_eq!(
            stats,
            CycleStats {
                feeds: 1,
                entries: 3,
                published: 1,
                failed: 1,
            }
        );

        let articles = crawler.publisher.articles.lock().unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source_url, format!("{}/a.html", server.uri()));
        assert_eq!(articles[0].category_id, 4);
        assert_eq!(articles[0].source_name, "中国新闻网");
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_cycle() {
        let (_server, feed) = setup().await;
        let publisher = Recording {
            fail: true,
            ..Default::default()
        };
        let stats = crawler(publisher, feed).run_once().await;
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.published, 0);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_scope_limit_and_category() {
        let (_server, feed) = setup().await;
        let limited = crawler(Recording::default(), feed).with_scope(CrawlScope {
            category: None,
            limit: Some(1),
        });
        let stats = limited.run_once().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.published, 1);

        let other = crawler(Recording::default(), feed).with_scope(CrawlScope {
            category: Some(1),
            limit: None,
        });
        assert_eq!(other.run_once().await.feeds, 0);
    }

    #[tokio::test]
    async fn test_unreachable_feed_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let url: &'static str = Box::leak(format!("{}/feed.xml", server.uri()).into_boxed_str());
        let feed = FeedSource {
            url,
            category_id: 1,
            source_name: "人民网",
        };
        let stats = crawler(Recording::default(), feed).run_once().await;
        assert_eq!(stats.feeds, 1);
        assert_eq!(stats.entries, 0);
    }

    /// A one-entry feed whose response is held back by `delay`.
    async fn slow_feed(delay: Duration) -> (MockServer, FeedSource) {
        let server = MockServer::start().await;
        let rss = format!(
            "<rss version=\"2.0\"><channel><title>t</title>\
             <item><link>{}/a.html</link></item></channel></rss>",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss).set_delay(delay))
            .mount(&server)
            .await;
        serve(&server, "/a.html", long_page()).await;

        let url: &'static str = Box::leak(format!("{}/feed.xml", server.uri()).into_boxed_str());
        let feed = FeedSource {
            url,
            category_id: 2,
            source_name: "人民网",
        };
        (server, feed)
    }

    #[tokio::test]
    async fn test_shutdown_during_cycle_finishes_cycle_then_stops() {
        let (_server, feed) = slow_feed(Duration::from_millis(300)).await;
        let crawler = crawler(Recording::default(), feed);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(());
        });

        let cycles = tokio::time::timeout(
            Duration::from_secs(10),
            crawler.run_until(Duration::from_secs(3600), async {
                let _ = rx.await;
            }),
        )
        .await
        .expect("loop should stop without waiting out the interval");

        assert_eq!(cycles, 1);
        assert_eq!(crawler.publisher.articles.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_sleep_stops_loop() {
        let (_server, feed) = slow_feed(Duration::ZERO).await;
        let crawler = crawler(Recording::default(), feed);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = tx.send(());
        });

        let cycles = tokio::time::timeout(
            Duration::from_secs(10),
            crawler.run_until(Duration::from_secs(3600), async {
                let _ = rx.await;
            }),
        )
        .await
        .expect("loop should stop during the sleep");
        assert_eq!(cycles, 1);
    }

    #[tokio::test]
    async fn test_loop_repeats_until_shutdown() {
        let (_server, feed) = slow_feed(Duration::ZERO).await;
        let crawler = crawler(Recording::default(), feed);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = tx.send(());
        });

        let cycles = crawler
            .run_until(Duration::from_millis(20), async {
                let _ = rx.await;
            })
            .await;
        assert!(cycles >= 2, "only {cycles} cycles ran");
        assert_eq!(crawler.publisher.articles.lock().unwrap().len(), cycles);
    }
}
