//! Article assembly and the quality gate.

use crate::models::{Article, CRAWLER_AUTHOR_ID, PUBLISHED, RecoveredMetadata};
use crate::rules::CompiledRules;
use crate::utils::{iso_now, truncate_chars};
use tracing::info;

/// Where an article came from.
#[derive(Debug, Clone, Copy)]
pub struct ArticleOrigin<'a> {
    /// The article's own URL (the feed entry link).
    pub source_url: &'a str,
    pub category_id: i64,
    pub source_name: &'a str,
}

/// Build the published record, or `None` when the content is too short.
///
/// The plain-text length of the joined paragraphs is the only quality gate.
pub fn assemble(
    paragraphs: Vec<String>,
    metadata: RecoveredMetadata,
    cover: Option<String>,
    origin: ArticleOrigin<'_>,
    rules: &CompiledRules,
) -> Option<Article> {
    let text = paragraphs.join("\n");
    let text_len = text.chars().count();
    if text_len < rules.min_content_chars {
        info!(
            url = %origin.source_url,
            text_len,
            cover = ?cover,
            "[SKIP] content below minimum length"
        );
        return None;
    }

    let title = if metadata.title.is_empty() {
        origin.source_url.to_string()
    } else {
        metadata.title
    };

    Some(Article {
        title,
        summary: summarize(&text, rules.summary_max_chars),
        content: paragraphs,
        cover_image: cover,
        author_id: CRAWLER_AUTHOR_ID,
        category_id: origin.category_id,
        source_url: origin.source_url.to_string(),
        source_name: origin.source_name.to_string(),
        publish_time: metadata.publish_date.unwrap_or_else(iso_now),
        status: PUBLISHED.to_string(),
    })
}

/// One-line summary: newlines become spaces, capped at `max` chars.
pub fn summarize(text: &str, max: usize) -> String {
    truncate_chars(&text.trim().replace('\n', " "), max)
}
