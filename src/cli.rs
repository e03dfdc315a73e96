//! Command-line interface definitions for the news crawler.
//!
//! Every option can also be set through an environment variable, using the
//! same names as the existing container deployment.

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the news crawler.
///
/// # Examples
///
/// ```sh
/// # Poll the feeds every 10 minutes and publish to Kafka
/// newshub_crawler crawl --kafka-bootstrap kafka:9092
///
/// # One pass over the sports feeds, printing records instead of publishing
/// newshub_crawler crawl --loop false --dry-run --category 4
///
/// # Run the extraction pipeline on one page
/// newshub_crawler extract https://www.chinanews.com.cn/ty/2025/06-03/1.shtml
///
/// # Push weather for one region
/// newshub_crawler weather 广东
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional YAML file overriding the built-in extraction rules
    #[arg(long, global = true, env = "NEWSHUB_RULES")]
    pub rules: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the RSS feeds and publish extracted articles
    Crawl(CrawlArgs),
    /// Run the extraction pipeline on a single article URL
    Extract(ExtractArgs),
    /// Fetch regional weather and post it to the backend
    Weather(WeatherArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Seconds to sleep between crawl cycles
    #[arg(long, env = "CRAWLER_INTERVAL_SECONDS", default_value_t = 600)]
    pub interval_secs: u64,

    /// Kafka bootstrap servers (comma-separated host:port)
    #[arg(long, env = "KAFKA_BOOTSTRAP", default_value = "localhost:9092")]
    pub kafka_bootstrap: String,

    /// Kafka topic articles are published to
    #[arg(long, env = "KAFKA_TOPIC", default_value = "news-crawler-topic")]
    pub kafka_topic: String,

    /// Keep crawling every interval (`false` runs a single cycle)
    #[arg(
        long = "loop",
        env = "CRAWLER_LOOP",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub run_loop: bool,

    /// Print records as JSON lines instead of publishing to Kafka
    #[arg(long)]
    pub dry_run: bool,

    /// Per-request fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Only crawl feeds of this category id
    #[arg(long)]
    pub category: Option<i64>,

    /// Process at most this many entries per feed
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Article page to extract
    pub url: String,

    /// Category id stamped on the record
    #[arg(long, default_value_t = 3)]
    pub category: i64,

    /// Per-request fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug)]
pub struct WeatherArgs {
    /// Single region to crawl; all regions when omitted
    pub city: Option<String>,

    /// Backend weather ingestion endpoint
    #[arg(
        long,
        env = "BACKEND_API_URL",
        default_value = "http://127.0.0.1:8080/api/public/weather/update"
    )]
    pub backend_url: String,
}
