//! JSON-lines publisher.
//!
//! Writes one record per line to any [`Write`] sink. `crawl --dry-run`
//! points it at stdout so a crawl can be inspected without a broker.

use crate::errors::Result;
use crate::models::Article;
use crate::outputs::{Publisher, encode_record};
use std::io::{self, Stdout, Write};
use std::sync::Mutex;
use tracing::debug;

/// Writes each article as one JSON line to a shared sink.
///
/// Writes are flushed per record, which stands in for the broker ack.
pub struct JsonLinesPublisher<W: Write> {
    sink: Mutex<W>,
}

impl JsonLinesPublisher<Stdout> {
    /// Publisher writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesPublisher<W> {
    /// Wrap `sink`.
    ///
    /// # Arguments
    ///
    /// * `sink` - Any writer; records are appended in publish order
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Take the sink back, e.g. to inspect what was written.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.sink.into_inner() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    async fn publish(&self, article: &Article) -> Result<()> {
        let mut line = encode_record(article)?;
        line.push(b'\n');

        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sink.write_all(&line)?;
        sink.flush()?;
        debug!(url = %article.source_url, "Wrote JSON record");
        Ok(())
    }
}
