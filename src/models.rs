//! Data models shared by the extraction pipeline, the crawler and the
//! weather job.
//!
//! - [`FeedSource`]: one statically configured RSS feed
//! - [`RawPage`]: raw bytes of one fetched article page
//! - [`ExtractionResult`]: the isolated main content of a page
//! - [`Article`]: the normalized record published downstream
//! - [`WeatherReading`]: one region's weather for the backend endpoint
//!
//! The published models use camelCase on the wire to match the backend's
//! JSON schema.

use serde::{Deserialize, Serialize};

/// Literal status attached to every emitted [`Article`].
pub const PUBLISHED: &str = "PUBLISHED";

/// Author id the backend expects for crawler-created articles.
pub const CRAWLER_AUTHOR_ID: i64 = 1;

/// A statically configured RSS/Atom feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSource {
    /// The feed document URL.
    pub url: &'static str,
    /// Backend category the feed's articles are filed under.
    pub category_id: i64,
    /// Display name copied into every article from this feed.
    pub source_name: &'static str,
}

/// Raw response of one article fetch.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Response body, undecoded.
    pub bytes: Vec<u8>,
    /// Charset from the `Content-Type` header, if the server sent one.
    pub claimed_encoding: Option<String>,
    /// URL after redirects.
    pub final_url: String,
}

/// One block-level element of the isolated main content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// A `<p>` element's text.
    Paragraph(String),
    /// A figure/picture ("graphic") element and the source of its image.
    Figure { src: String },
    /// A bare `<img>` with a source attribute.
    Image { src: String },
    /// Any other text-bearing block (headings, list items, quotes).
    Other(String),
}

/// The isolated main content of a page plus what the extractor recovered
/// about it. Recomputed on every call, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Block elements of the main content in document order.
    pub blocks: Vec<ContentBlock>,
    /// The extractor's flattened text view of the main content.
    pub text: String,
    /// Title recovered by the extractor.
    pub title: Option<String>,
    /// Publish date recovered by the extractor, as found in the page.
    pub published: Option<String>,
}

/// Title and publish date recovered for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveredMetadata {
    /// Best title found; empty when nothing was found.
    pub title: String,
    /// Normalized publish date, when the extractor found one.
    pub publish_date: Option<String>,
}

/// The normalized article record published to the message topic.
///
/// `content` holds the article as an ordered list of paragraphs. On the wire
/// it travels as paragraph markup, see [`paragraph_markup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub summary: String,
    #[serde(with = "paragraph_markup")]
    pub content: Vec<String>,
    pub cover_image: Option<String>,
    pub author_id: i64,
    pub category_id: i64,
    pub source_url: String,
    pub source_name: String,
    pub publish_time: String,
    pub status: String,
}

impl Article {
    /// Newline-joined plain text view of the content.
    pub fn plain_text(&self) -> String {
        self.content.join("\n")
    }
}

/// Serde adapter turning a paragraph list into `<p>..</p>` markup and back.
pub mod paragraph_markup {
    use once_cell::sync::Lazy;
    use scraper::{Html, Selector};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::expect_used)]
    static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

    /// Wrap each paragraph in `<p>` with its text escaped.
    pub fn render(paragraphs: &[String]) -> String {
        paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", escape(p)))
            .collect()
    }

    /// Recover the paragraph texts from rendered markup.
    pub fn parse(markup: &str) -> Vec<String> {
        Html::parse_fragment(markup)
            .select(&PARAGRAPH)
            .map(|p| p.text().collect::<String>())
            .collect()
    }

    fn escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(c),
            }
        }
        out
    }

    pub fn serialize<S>(paragraphs: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&render(paragraphs))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let markup = String::deserialize(deserializer)?;
        Ok(parse(&markup))
    }
}

/// One region's weather as posted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Region name, e.g. "北京".
    pub name: String,
    /// Condition description.
    #[serde(rename = "type")]
    pub condition: String,
    /// Current temperature with the "°C" suffix.
    pub temp: String,
    /// Daily low with the "°C" suffix.
    pub low: String,
    /// Daily high with the "°C" suffix.
    pub high: String,
    /// Forecast date, `YYYY-MM-DD`.
    pub date: String,
}
