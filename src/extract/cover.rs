//! Cover image selection.
//!
//! Only the isolated content is searched, never the raw page, so site
//! chrome images cannot become covers. A figure wins over a bare image.
//! The chosen source is made absolute against the article URL and dropped
//! when it hits the denylist.

use crate::models::{ContentBlock, ExtractionResult};
use crate::rules::CompiledRules;
use crate::utils::resolve_url;
use tracing::debug;

/// Pick, resolve and filter the cover image of an extraction.
pub fn resolve_cover(
    extraction: &ExtractionResult,
    base_url: &str,
    rules: &CompiledRules,
) -> Option<String> {
    let src = find_candidate(&extraction.blocks)?;
    let resolved = resolve_url(base_url, src)?;

    if rules.is_denied_image(&resolved) {
        debug!(cover = %resolved, "Cover rejected by denylist");
        return None;
    }
    Some(resolved)
}

fn find_candidate(blocks: &[ContentBlock]) -> Option<&str> {
    let figure = blocks.iter().find_map(|b| match b {
        ContentBlock::Figure { src } => Some(src.as_str()),
        _ => None,
    });
    figure.or_else(|| {
        blocks.iter().find_map(|b| match b {
            ContentBlock::Image { src } => Some(src.as_str()),
            _ => None,
        })
    })
}
