//! Main-content isolation.
//!
//! Finding the article body is delegated to a readability extractor behind
//! the [`ContentExtractor`] trait. Whatever the extractor hands back is
//! normalized into an [`ExtractionResult`]: the content markup is walked in
//! document order and every paragraph, figure and image becomes a
//! [`ContentBlock`]. [`reconstruct_paragraphs`] then turns that tree into the
//! article's paragraph list and strips boilerplate.

use crate::models::{ContentBlock, ExtractionResult};
use crate::rules::CompiledRules;
use dom_smoothie::{Config, Readability};
use itertools::Itertools;
use scraper::{ElementRef, Html};
use tracing::debug;

/// What a readability extractor returns for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtraction {
    /// Markup of the isolated main content, images included.
    pub content_html: String,
    /// Flattened text of the main content.
    pub text: String,
    pub title: Option<String>,
    pub published: Option<String>,
}

/// A readability-style main-content extractor.
pub trait ContentExtractor {
    /// Isolate the main content of `html`, fetched from `url`.
    ///
    /// `None` means the page is not an article.
    fn extract(&self, html: &str, url: &str) -> Option<RawExtraction>;
}

/// [`ContentExtractor`] backed by `dom_smoothie`'s port of Mozilla Readability.
///
/// Readability keeps `<img>` and `<figure>` elements in its output, so the
/// images of the article body survive isolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor;

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: &str) -> Option<RawExtraction> {
        let cfg = Config {
            max_elements_to_parse: 9000,
            ..Default::default()
        };

        let mut readability = match Readability::new(html, Some(url), Some(cfg)) {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "Readability could not load document");
                return None;
            }
        };
        let article = match readability.parse() {
            Ok(a) => a,
            Err(e) => {
                debug!(%url, error = %e, "Readability found no article");
                return None;
            }
        };

        Some(RawExtraction {
            content_html: article.content.to_string(),
            text: article.text_content.to_string(),
            title: non_empty(&article.title),
            published: article.published_time.as_deref().and_then(non_empty),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Run the extractor and normalize its output.
///
/// Returns `None` when the extractor finds nothing or isolates an empty body.
pub fn isolate<E: ContentExtractor + ?Sized>(
    extractor: &E,
    html: &str,
    url: &str,
) -> Option<ExtractionResult> {
    let raw = extractor.extract(html, url)?;
    let blocks = parse_blocks(&raw.content_html);
    if blocks.is_empty() && raw.text.trim().is_empty() {
        debug!(%url, "Extractor isolated an empty body");
        return None;
    }
    Some(ExtractionResult {
        blocks,
        text: raw.text,
        title: raw.title,
        published: raw.published,
    })
}

/// Walk content markup in document order and classify its block elements.
pub fn parse_blocks(content_html: &str) -> Vec<ContentBlock> {
    let fragment = Html::parse_fragment(content_html);
    let mut blocks = Vec::new();

    for el in fragment.root_element().descendants().filter_map(ElementRef::wrap) {
        match el.value().name() {
            "p" => blocks.push(ContentBlock::Paragraph(el.text().collect())),
            "figure" | "picture" => {
                if let Some(src) = figure_source(el) {
                    blocks.push(ContentBlock::Figure { src });
                }
            }
            "img" => {
                if inside_figure(el) {
                    continue;
                }
                if let Some(src) = attr(el, "src") {
                    blocks.push(ContentBlock::Image { src });
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "blockquote" | "pre" => {
                let text = collapse_whitespace(&el.text().collect::<String>());
                if !text.is_empty() {
                    blocks.push(ContentBlock::Other(text));
                }
            }
            _ => {}
        }
    }
    blocks
}

fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn figure_source(figure: ElementRef<'_>) -> Option<String> {
    figure
        .descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|el| match el.value().name() {
            "img" => attr(el, "src"),
            "source" => attr(el, "srcset")
                .and_then(|set| set.split(',').next().map(str::to_string))
                .and_then(|first| first.split_whitespace().next().map(str::to_string)),
            _ => None,
        })
}

fn inside_figure(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "figure" | "picture"))
}

/// Collapse every whitespace run to one space and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Build the article's paragraph list from an extraction.
///
/// Paragraph blocks are used when the content has any; otherwise the
/// extractor's flattened text is split into lines. Each paragraph is
/// trimmed at both ends, its inner text left as written. Boilerplate rules
/// run last, in order.
pub fn reconstruct_paragraphs(extraction: &ExtractionResult, rules: &CompiledRules) -> Vec<String> {
    let has_paragraphs = extraction
        .blocks
        .iter()
        .any(|b| matches!(b, ContentBlock::Paragraph(_)));

    let mut paragraphs: Vec<String> = if has_paragraphs {
        extraction
            .blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Paragraph(text) => Some(text.trim().to_string()),
                _ => None,
            })
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        extraction
            .text
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    };

    rules.strip_boilerplate(&mut paragraphs);
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor(Option<RawExtraction>);

    impl ContentExtractor for FixedExtractor {
        fn extract(&self, _html: &str, _url: &str) -> Option<RawExtraction> {
            self.0.clone()
        }
    }

    fn extraction(blocks: Vec<ContentBlock>, text: &str) -> ExtractionResult {
        ExtractionResult {
            blocks,
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_blocks_in_document_order() {
        let html = r#"<div>
            <h2>小标题</h2>
            <p>第一段</p>
            <img src="/a.jpg">
            <figure><img src="/b.jpg"><figcaption>图说</figcaption></figure>
            <p>第二段</p>
        </div>"#;
        assert_eq!(
            parse_blocks(html),
            vec![
                ContentBlock::Other("小标题".to_string()),
                ContentBlock::Paragraph("第一段".to_string()),
                ContentBlock::Image { src: "/a.jpg".to_string() },
                ContentBlock::Figure { src: "/b.jpg".to_string() },
                ContentBlock::Paragraph("第二段".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_blocks_skips_images_without_src() {
        let blocks = parse_blocks(r#"<p>文字</p><img alt="x"><img src="  ">"#);
        assert_eq!(blocks, vec![ContentBlock::Paragraph("文字".to_string())]);
    }

    #[test]
    fn test_picture_source_srcset() {
        let html = r#"<picture><source srcset="/big.webp 2x, /small.webp 1x"></picture>"#;
        assert_eq!(
            parse_blocks(html),
            vec![ContentBlock::Figure { src: "/big.webp".to_string() }]
        );
    }

    #[test]
    fn test_isolate_none_when_extractor_empty() {
        let extractor = FixedExtractor(None);
        assert!(isolate(&extractor, "<html></html>", "https://site.example/").is_none());
    }

    #[test]
    fn test_isolate_none_when_body_empty() {
        let extractor = FixedExtractor(Some(RawExtraction {
            content_html: "<div> </div>".to_string(),
            text: "  ".to_string(),
            ..Default::default()
        }));
        assert!(isolate(&extractor, "<html></html>", "https://site.example/").is_none());
    }

    #[test]
    fn test_isolate_carries_metadata() {
        let extractor = FixedExtractor(Some(RawExtraction {
            content_html: "<p>正文</p>".to_string(),
            text: "正文".to_string(),
            title: Some("标题".to_string()),
            published: Some("2025-06-03".to_string()),
        }));
        let result = isolate(&extractor, "", "https://site.example/").unwrap();
        assert_eq!(result.title.as_deref(), Some("标题"));
        assert_eq!(result.published.as_deref(), Some("2025-06-03"));
        assert_eq!(result.blocks, vec![ContentBlock::Paragraph("正文".to_string())]);
    }

    #[test]
    fn test_paragraphs_trimmed_and_empty_dropped() {
        let ex = extraction(
            vec![
                ContentBlock::Paragraph("　　第一段\n  续行 ".to_string()),
                ContentBlock::Paragraph("   ".to_string()),
                ContentBlock::Image { src: "/a.jpg".to_string() },
                ContentBlock::Paragraph("第二段".to_string()),
            ],
            "ignored",
        );
        assert_eq!(
            reconstruct_paragraphs(&ex, &CompiledRules::default()),
            vec!["第一段\n  续行", "第二段"]
        );
    }

    #[test]
    fn test_inner_spacing_preserved() {
        let ex = extraction(
            vec![ContentBlock::Paragraph("  A  B   C  ".to_string())],
            "",
        );
        assert_eq!(
            reconstruct_paragraphs(&ex, &CompiledRules::default()),
            vec!["A  B   C"]
        );
    }

    #[test]
    fn test_falls_back_to_text_lines() {
        let ex = extraction(
            vec![ContentBlock::Other("标题".to_string())],
            "第一行\n\n   第二行  \n",
        );
        assert_eq!(
            reconstruct_paragraphs(&ex, &CompiledRules::default()),
            vec!["第一行", "第二行"]
        );
    }

    #[test]
    fn test_boilerplate_stripped_after_reconstruction() {
        let ex = extraction(
            vec![
                ContentBlock::Paragraph("正文内容".to_string()),
                ContentBlock::Paragraph("（责任编辑：王小明）".to_string()),
                ContentBlock::Paragraph("2025年06月03日 10:20".to_string()),
            ],
            "",
        );
        assert_eq!(
            reconstruct_paragraphs(&ex, &CompiledRules::default()),
            vec!["正文内容"]
        );
    }
}
