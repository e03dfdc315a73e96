//! Publishing finished articles.
//!
//! # Submodules
//!
//! - [`kafka`]: the long-lived Kafka producer used in production
//!   (feature `kafka`)
//! - [`json`]: JSON lines on any writer, used for dry runs and the
//!   `extract` command
//!
//! Records are UTF-8 JSON with non-ASCII characters written literally.

pub mod json;
#[cfg(feature = "kafka")]
pub mod kafka;

use crate::errors::Result;
use crate::models::Article;

/// Something that accepts finished articles.
///
/// `publish` resolves once the record is acknowledged; callers await it
/// before moving on to the next article.
pub trait Publisher {
    async fn publish(&self, article: &Article) -> Result<()>;
}

/// Serialize an article as published on the wire.
pub fn encode_record(article: &Article) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(article)?)
}
