//! # Newshub Crawler
//!
//! Polls a fixed set of Chinese news RSS feeds, turns each linked page into
//! a clean article record and publishes it to Kafka for the news backend.
//! A companion job pushes regional weather to the backend.
//!
//! ## Usage
//!
//! ```sh
//! newshub_crawler crawl
//! newshub_crawler extract <URL>
//! newshub_crawler weather [CITY]
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: list entry links from each feed
//! 2. **Fetching**: download each article page
//! 3. **Extraction**: decode, isolate the main content, recover metadata,
//!    pick a cover image and assemble the record (see [`extract`])
//! 4. **Publishing**: send the record and wait for the broker's ack
//!
//! Logs go to stderr so `--dry-run` and `extract` output on stdout stays
//! machine-readable.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod crawler;
mod errors;
mod extract;
mod models;
mod outputs;
mod rules;
mod utils;
mod weather;

use cli::{Cli, Command, CrawlArgs, ExtractArgs, WeatherArgs};
use crawler::fetch::{build_client, fetch_page};
use crawler::{CrawlScope, Crawler};
use extract::Pipeline;
use extract::assembler::ArticleOrigin;
use outputs::Publisher;
use outputs::json::JsonLinesPublisher;
use rules::{CompiledRules, ExtractionRules};
use utils::truncate_for_log;
use weather::WeatherJob;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newshub_crawler starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let rules = load_rules(args.rules.as_deref())?;

    match args.command {
        Command::Crawl(crawl) => run_crawl(crawl, rules).await?,
        Command::Extract(extract) => run_extract(extract, rules).await?,
        Command::Weather(weather) => run_weather(weather).await?,
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}

/// Built-in rules, or the YAML file at `path` when one is given.
fn load_rules(path: Option<&str>) -> Result<CompiledRules, Box<dyn Error>> {
    let rules = match path {
        Some(path) => ExtractionRules::load(Path::new(path))?,
        None => ExtractionRules::default(),
    };
    let compiled = rules.compile()?;
    info!(
        min_content_chars = rules.min_content_chars,
        boilerplate_rules = rules.boilerplate.len(),
        custom = path.is_some(),
        "Extraction rules ready"
    );
    Ok(compiled)
}

#[instrument(level = "info", skip_all, fields(dry_run = args.dry_run, run_loop = args.run_loop))]
async fn run_crawl(args: CrawlArgs, rules: CompiledRules) -> Result<(), Box<dyn Error>> {
    let client = build_client(Duration::from_secs(args.timeout_secs))?;
    let pipeline = Pipeline::readability(rules);
    let scope = CrawlScope {
        category: args.category,
        limit: args.limit,
    };
    let interval = Duration::from_secs(args.interval_secs);

    if args.dry_run {
        let crawler = Crawler::new(client, pipeline, JsonLinesPublisher::stdout()).with_scope(scope);
        drive(&crawler, args.run_loop, interval).await;
        return Ok(());
    }

    let publisher = connect_publisher(&args.kafka_bootstrap, &args.kafka_topic).await?;
    let crawler = Crawler::new(client, pipeline, publisher).with_scope(scope);
    drive(&crawler, args.run_loop, interval).await;
    Ok(())
}

#[cfg(feature = "kafka")]
async fn connect_publisher(
    bootstrap: &str,
    topic: &str,
) -> Result<outputs::kafka::KafkaPublisher, Box<dyn Error>> {
    Ok(outputs::kafka::KafkaPublisher::connect(bootstrap, topic).await?)
}

#[cfg(not(feature = "kafka"))]
async fn connect_publisher(
    bootstrap: &str,
    topic: &str,
) -> Result<JsonLinesPublisher<std::io::Stdout>, Box<dyn Error>> {
    warn!(%bootstrap, %topic, "Built without the `kafka` feature; use --dry-run");
    Err("kafka publishing is not available in this build".into())
}

async fn drive<P: Publisher>(crawler: &Crawler<P>, run_loop: bool, interval: Duration) {
    if run_loop {
        crawler.run_loop(interval).await;
    } else {
        crawler.run_once().await;
    }
}

#[instrument(level = "info", skip_all, fields(url = %args.url))]
async fn run_extract(args: ExtractArgs, rules: CompiledRules) -> Result<(), Box<dyn Error>> {
    let client = build_client(Duration::from_secs(args.timeout_secs))?;
    let page = fetch_page(&client, &args.url).await?;

    let source_name = url::Url::parse(&args.url)?
        .host_str()
        .unwrap_or_default()
        .to_string();
    let origin = ArticleOrigin {
        source_url: &args.url,
        category_id: args.category,
        source_name: &source_name,
    };
    match Pipeline::readability(rules).process(&page, origin) {
        Some(article) => println!("{}", serde_json::to_string_pretty(&article)?),
        None => warn!(
            bytes = page.bytes.len(),
            head = %truncate_for_log(&String::from_utf8_lossy(&page.bytes), 200),
            "No article extracted (not an article, or below the length gate)"
        ),
    }
    Ok(())
}

async fn run_weather(args: WeatherArgs) -> Result<(), Box<dyn Error>> {
    let job = WeatherJob::new(args.backend_url)?;
    let readings = job.run(args.city.as_deref()).await;
    info!(count = readings.len(), "Weather job finished");
    Ok(())
}
