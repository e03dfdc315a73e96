//! Kafka publisher.
//!
//! One client and one partition client are created at startup and reused
//! for every record. Each `publish` waits for the broker's acknowledgment
//! (the assigned offset) before returning.

use crate::errors::{CrawlError, Result};
use crate::models::Article;
use crate::outputs::{Publisher, encode_record};
use chrono::Utc;
use rskafka::client::ClientBuilder;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Partition every record is produced to.
const PARTITION: i32 = 0;

/// Publishes article records to one Kafka topic.
///
/// rskafka keeps no send buffer, so a record is on the broker once
/// `publish` returns and dropping the publisher loses nothing.
pub struct KafkaPublisher {
    topic: String,
    partition: PartitionClient,
}

impl KafkaPublisher {
    /// Connect to the brokers and open the topic's partition client.
    ///
    /// # Arguments
    ///
    /// * `bootstrap` - Comma-separated `host:port` broker list
    /// * `topic` - Topic every record is produced to
    ///
    /// # Returns
    ///
    /// * `Result<KafkaPublisher>` - The connected publisher, or
    ///   `CrawlError::Publish` when no broker is configured or reachable
    #[instrument(level = "info", skip_all, fields(%bootstrap, %topic))]
    pub async fn connect(bootstrap: &str, topic: &str) -> Result<Self> {
        let brokers = parse_bootstrap(bootstrap);
        if brokers.is_empty() {
            return Err(CrawlError::Publish("no kafka brokers configured".to_string()));
        }

        let client = ClientBuilder::new(brokers)
            .build()
            .await
            .map_err(|e| CrawlError::Publish(format!("connect: {e}")))?;
        let partition = client
            .partition_client(topic.to_string(), PARTITION, UnknownTopicHandling::Retry)
            .await
            .map_err(|e| CrawlError::Publish(format!("partition client: {e}")))?;

        info!("Kafka producer connected");
        Ok(Self {
            topic: topic.to_string(),
            partition,
        })
    }
}

impl Publisher for KafkaPublisher {
    #[instrument(level = "debug", skip_all, fields(topic = %self.topic, url = %article.source_url))]
    async fn publish(&self, article: &Article) -> Result<()> {
        let record = Record {
            key: None,
            value: Some(encode_record(article)?),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };
        let offsets = self
            .partition
            .produce(vec![record], Compression::NoCompression)
            .await
            .map_err(|e| CrawlError::Publish(e.to_string()))?;
        debug!(?offsets, "Record acknowledged");
        Ok(())
    }
}

/// Split a comma-separated broker list.
pub fn parse_bootstrap(bootstrap: &str) -> Vec<String> {
    bootstrap
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}
