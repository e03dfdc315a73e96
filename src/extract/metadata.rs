//! Title and publish-date recovery.
//!
//! The extractor's title wins. Without one, the raw page is parsed on its
//! own and `og:title`, then `<title>`, are tried. The publish date only ever
//! comes from the extractor; the assembler substitutes "now" when it is
//! missing.

use crate::models::{ExtractionResult, RecoveredMetadata};
use crate::utils::normalize_timestamp;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

#[allow(clippy::expect_used)]
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));

#[allow(clippy::expect_used)]
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));

/// Recover title and publish date for one page.
pub fn recover(extraction: &ExtractionResult, raw_html: &str) -> RecoveredMetadata {
    let title = extraction
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_title(raw_html));

    RecoveredMetadata {
        title,
        publish_date: extraction.published.as_deref().map(normalize_timestamp),
    }
}

/// Title from page markup: `og:title`, then `<title>`, then empty.
pub fn fallback_title(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);

    let og = document
        .select(&OG_TITLE)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(title) = og {
        return title.to_string();
    }

    document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
