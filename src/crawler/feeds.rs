//! The fixed feed list and RSS/Atom entry-link indexing.
//!
//! | Publication | Feeds | Categories |
//! |-------------|-------|------------|
//! | 人民网 (people.com.cn) | politics, world, sports | 1, 2, 4 |
//! | 中国新闻网 (chinanews.com.cn) | scroll-news, world, sports | 1, 2, 4 |

use crate::crawler::fetch::fetch_page;
use crate::errors::{CrawlError, Result};
use crate::extract::encoding;
use crate::models::FeedSource;
use feed_rs::model::Entry;
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::borrow::Cow;
use tracing::{debug, info, instrument};

const PEOPLE: &str = "人民网";
const CHINANEWS: &str = "中国新闻网";

#[allow(clippy::expect_used)]
static XML_DECL_ENCODING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\A(\s*<\?xml[^>]*?encoding\s*=\s*["'])[^"']*(["'])"#).expect("valid regex")
});

/// Every feed the crawler polls, in polling order.
pub const FEEDS: &[FeedSource] = &[
    FeedSource {
        url: "http://www.people.com.cn/rss/politics.xml",
        category_id: 1,
        source_name: PEOPLE,
    },
    FeedSource {
        url: "http://www.chinanews.com.cn/rss/scroll-news.xml",
        category_id: 1,
        source_name: CHINANEWS,
    },
    FeedSource {
        url: "http://www.people.com.cn/rss/world.xml",
        category_id: 2,
        source_name: PEOPLE,
    },
    FeedSource {
        url: "http://www.chinanews.com.cn/rss/world.xml",
        category_id: 2,
        source_name: CHINANEWS,
    },
    FeedSource {
        url: "http://www.chinanews.com.cn/rss/sports.xml",
        category_id: 4,
        source_name: CHINANEWS,
    },
    FeedSource {
        url: "http://www.people.com.cn/rss/sports.xml",
        category_id: 4,
        source_name: PEOPLE,
    },
];

/// Fetch a feed and list its entry links in document order.
///
/// The body goes through the encoding resolver first, so GB2312/GBK feeds
/// are handed to the parser as UTF-8.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `feed` - The feed to index
///
/// # Returns
///
/// The entry links, or an error if the fetch fails or the body is not a feed.
#[instrument(level = "info", skip_all, fields(feed = %feed.url))]
pub async fn index_feed(client: &Client, feed: &FeedSource) -> Result<Vec<String>> {
    let page = fetch_page(client, feed.url).await?;
    let xml = encoding::resolve(&page.bytes);
    let links = parse_entry_links(&xml)?;

    info!(count = links.len(), source = feed.source_name, "Indexed feed entries");
    debug!(urls = ?links, "Feed entry links");
    Ok(links)
}

/// Entry links of an RSS or Atom document. Entries without a link are
/// skipped.
pub fn parse_entry_links(xml: &str) -> Result<Vec<String>> {
    let xml = declare_utf8(xml);
    let feed = parser::parse(xml.as_bytes()).map_err(|e| CrawlError::Feed(e.to_string()))?;

    Ok(feed.entries.iter().filter_map(select_entry_link).collect())
}

/// The entry's `alternate` (or untyped) link, else its first non-empty one.
fn select_entry_link(entry: &Entry) -> Option<String> {
    let usable = || entry.links.iter().filter(|l| !l.href.trim().is_empty());

    usable()
        .find(|l| {
            l.rel
                .as_deref()
                .is_none_or(|rel| rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| usable().next())
        .map(|l| l.href.trim().to_string())
}

/// Rewrite the prolog's `encoding` to UTF-8. The text is already decoded,
/// so a leftover `gb2312` declaration would make the parser decode twice.
fn declare_utf8(xml: &str) -> Cow<'_, str> {
    XML_DECL_ENCODING.replace(xml, "${1}UTF-8${2}")
}
