//! The article-extraction pipeline.
//!
//! Raw page bytes flow through five stages:
//!
//! 1. [`encoding`]: bytes to text (UTF-8, GB18030, detected)
//! 2. [`isolator`]: readability isolation and paragraph reconstruction
//! 3. [`metadata`]: title and publish date
//! 4. [`cover`]: cover image from the isolated content
//! 5. [`assembler`]: quality gate and the final [`Article`]
//!
//! Every call is independent and shares no mutable state, so one
//! [`Pipeline`] can serve any number of pages.

pub mod assembler;
pub mod cover;
pub mod encoding;
pub mod isolator;
pub mod metadata;

use crate::models::{Article, RawPage};
use crate::rules::CompiledRules;
use assembler::ArticleOrigin;
use isolator::{ContentExtractor, ReadabilityExtractor};
use tracing::{debug, instrument};

/// Turns fetched pages into articles.
#[derive(Debug, Clone)]
pub struct Pipeline<E = ReadabilityExtractor> {
    extractor: E,
    rules: CompiledRules,
}

impl Pipeline<ReadabilityExtractor> {
    /// A pipeline using the readability extractor.
    pub fn readability(rules: CompiledRules) -> Self {
        Self::new(ReadabilityExtractor, rules)
    }
}

impl<E: ContentExtractor> Pipeline<E> {
    pub fn new(extractor: E, rules: CompiledRules) -> Self {
        Self { extractor, rules }
    }

    /// Decode a fetched page and run it through the pipeline.
    ///
    /// Relative image sources are resolved against the page's final URL.
    #[instrument(level = "debug", skip_all, fields(url = %origin.source_url))]
    pub fn process(&self, page: &RawPage, origin: ArticleOrigin<'_>) -> Option<Article> {
        let decoded = encoding::resolve_labeled(&page.bytes);
        debug!(
            encoding = decoded.encoding,
            claimed = ?page.claimed_encoding,
            "Decoded page"
        );
        self.process_html(&decoded.text, &page.final_url, origin)
    }

    /// Run already-decoded HTML through isolation, recovery and assembly.
    pub fn process_html(
        &self,
        html: &str,
        page_url: &str,
        origin: ArticleOrigin<'_>,
    ) -> Option<Article> {
        let Some(extraction) = isolator::isolate(&self.extractor, html, page_url) else {
            debug!(url = %origin.source_url, "Not an article");
            return None;
        };

        let paragraphs = isolator::reconstruct_paragraphs(&extraction, &self.rules);
        let recovered = metadata::recover(&extraction, html);
        let cover = cover::resolve_cover(&extraction, page_url, &self.rules);

        assembler::assemble(paragraphs, recovered, cover, origin, &self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use encoding_rs::GB18030;
    use isolator::RawExtraction;

    const URL: &str = "https://site.example/news/1.html";

    const ORIGIN: ArticleOrigin<'static> = ArticleOrigin {
        source_url: URL,
        category_id: 4,
        source_name: "中国新闻网",
    };

    /// Treats the whole `<body>` as the article, with no recovered metadata.
    struct BodyExtractor;

    impl ContentExtractor for BodyExtractor {
        fn extract(&self, html: &str, _url: &str) -> Option<RawExtraction> {
            let start = html.find("<body>")? + "<body>".len();
            let end = html.find("</body>")?;
            let body = &html[start..end];
            Some(RawExtraction {
                content_html: body.to_string(),
                text: body.to_string(),
                title: None,
                published: None,
            })
        }
    }

    fn weather_page(image_src: &str) -> String {
        let sentence = "今天天气很好".repeat(5);
        let paragraphs: String = (0..12)
            .map(|i| format!("<p>{sentence}，第{i}段，大家都出门散步了。</p>\n"))
            .collect();
        format!(
            r#"<html><head><meta charset="utf-8"><meta property="og:title" content="Test Title"></head><body><div class="article">
<p><img src="{image_src}"></p>
{paragraphs}</div></body></html>"#
        )
    }

    fn run_stub(html: &str) -> Option<Article> {
        Pipeline::new(BodyExtractor, CompiledRules::default()).process_html(html, URL, ORIGIN)
    }

    #[test]
    fn test_end_to_end_with_og_title_and_cover() {
        let article = run_stub(&weather_page("/x/photo.jpg")).unwrap();
        assert_eq!(article.title, "Test Title");
        assert_eq!(
            article.cover_image.as_deref(),
            Some("https://site.example/x/photo.jpg")
        );
        assert_eq!(article.content.len(), 12);
        assert!(article.plain_text().chars().count() >= 300);
    }

    #[test]
    fn test_end_to_end_icon_cover_dropped_article_kept() {
        let article = run_stub(&weather_page("/x/icon.jpg")).unwrap();
        assert_eq!(article.cover_image, None);
        assert_eq!(article.title, "Test Title");
    }

    #[test]
    fn test_end_to_end_short_page_skipped() {
        let html = r#"<html><head></head><body><p>今天天气很好</p></body></html>"#;
        assert!(run_stub(html).is_none());
    }

    #[test]
    fn test_not_an_article() {
        assert!(run_stub("<html>no body here</html>").is_none());
    }

    #[test]
    fn test_process_decodes_gb18030_bytes() {
        let html = weather_page("/x/photo.jpg");
        let (bytes, _, _) = GB18030.encode(&html);
        let page = RawPage {
            bytes: bytes.into_owned(),
            claimed_encoding: Some("gb2312".to_string()),
            final_url: URL.to_string(),
        };
        let article = Pipeline::new(BodyExtractor, CompiledRules::default())
            .process(&page, ORIGIN)
            .unwrap();
        assert!(article.content[0].starts_with("今天天气很好"));
    }

    #[test]
    fn test_cover_resolved_against_final_url() {
        let page = RawPage {
            bytes: weather_page("photo.jpg").into_bytes(),
            claimed_encoding: None,
            final_url: "https://m.site.example/2025/story.html".to_string(),
        };
        let article = Pipeline::new(BodyExtractor, CompiledRules::default())
            .process(&page, ORIGIN)
            .unwrap();
        assert_eq!(
            article.cover_image.as_deref(),
            Some("https://m.site.example/2025/photo.jpg")
        );
        assert_eq!(article.source_url, URL);
    }

    #[test]
    fn test_round_trip_through_json() {
        let article = run_stub(&weather_page("/x/photo.jpg")).unwrap();
        let json = serde_json::to_string(&article).unwrap();
        assert!(json.contains("今天天气很好"));
        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back, article);
    }

    #[test]
    fn test_readability_end_to_end() {
        let pipeline = Pipeline::readability(CompiledRules::default());
        let article = pipeline
            .process_html(&weather_page("/x/photo.jpg"), URL, ORIGIN)
            .unwrap();
        assert_eq!(article.title, "Test Title");
        assert_eq!(
            article.cover_image.as_deref(),
            Some("https://site.example/x/photo.jpg")
        );

        let article = pipeline
            .process_html(&weather_page("/x/icon.jpg"), URL, ORIGIN)
            .unwrap();
        assert_eq!(article.cover_image, None);
    }
}
