//! Weather companion job.
//!
//! Polls wttr.in for each provincial-level region, maps the report into
//! [`WeatherReading`]s and posts the batch to the backend's weather
//! ingestion endpoint. A failed region is logged and left out of the
//! batch; a failed post is logged and the job still ends normally.

use crate::errors::Result;
use crate::models::WeatherReading;
use chrono::Local;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// The 31 mainland provincial-level regions, in crawl order.
pub const REGIONS: [&str; 31] = [
    "北京", "天津", "上海", "重庆", "河北", "山西", "辽宁", "吉林", "黑龙江", "江苏", "浙江",
    "安徽", "福建", "江西", "山东", "河南", "湖北", "湖南", "广东", "海南", "四川", "贵州",
    "云南", "陕西", "甘肃", "青海", "内蒙古", "广西", "西藏", "宁夏", "新疆",
];

/// `city` query parameter sent when no single region was requested.
pub const DEFAULT_CITY: &str = "上海";

pub const WTTR_BASE: &str = "https://wttr.in";

const UNKNOWN_CONDITION: &str = "未知";
const SOURCE_TIMEOUT: Duration = Duration::from_secs(15);
const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);
const REGION_PAUSE: Duration = Duration::from_secs(1);

// Subset of the wttr.in `format=j1` report. Every value is a string.

#[derive(Debug, Deserialize)]
struct WttrReport {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
    #[serde(default)]
    weather: Vec<DailyForecast>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: Option<String>,
    #[serde(default)]
    lang_zh: Vec<LocalizedValue>,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<LocalizedValue>,
}

#[derive(Debug, Deserialize)]
struct DailyForecast {
    #[serde(rename = "mintempC")]
    min_temp_c: Option<String>,
    #[serde(rename = "maxtempC")]
    max_temp_c: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedValue {
    value: String,
}

fn celsius(value: Option<&str>) -> String {
    format!("{}°C", value.unwrap_or("N/A"))
}

/// Map one wttr.in report to a reading. `None` when the report lacks the
/// current conditions or the daily forecast.
fn reading_from(region: &str, report: &WttrReport) -> Option<WeatherReading> {
    let current = report.current_condition.first()?;
    let daily = report.weather.first()?;

    let condition = current
        .lang_zh
        .first()
        .or_else(|| current.weather_desc.first())
        .map(|v| v.value.clone())
        .unwrap_or_else(|| UNKNOWN_CONDITION.to_string());

    Some(WeatherReading {
        name: region.to_string(),
        condition,
        temp: celsius(current.temp_c.as_deref()),
        low: celsius(daily.min_temp_c.as_deref()),
        high: celsius(daily.max_temp_c.as_deref()),
        date: daily
            .date
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string()),
    })
}

/// Fetches regional weather from wttr.in and posts it to the backend.
///
/// One job owns its HTTP client and can be run repeatedly.
pub struct WeatherJob {
    client: Client,
    source_base: String,
    backend_url: String,
    pause: Duration,
}

impl WeatherJob {
    /// Build a job that posts to `backend_url`.
    ///
    /// # Arguments
    ///
    /// * `backend_url` - Full URL of the weather ingestion endpoint
    ///
    /// # Returns
    ///
    /// * `Result<WeatherJob>` - The job, or the client build error
    pub fn new(backend_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(SOURCE_TIMEOUT).build()?;
        Ok(Self {
            client,
            source_base: WTTR_BASE.to_string(),
            backend_url: backend_url.into(),
            pause: REGION_PAUSE,
        })
    }

    /// Point the job at another wttr.in-compatible host.
    pub fn with_source_base(mut self, base: impl Into<String>) -> Self {
        self.source_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Delay between two region requests. Zero disables it.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Crawl `target` (or every region) and post the readings.
    ///
    /// Returns the readings that were collected.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, target: Option<&str>) -> Vec<WeatherReading> {
        info!("Starting weather crawl");
        let regions: Vec<&str> = match target {
            Some(city) => vec![city],
            None => REGIONS.to_vec(),
        };

        let mut readings = Vec::with_capacity(regions.len());
        for (i, region) in regions.iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            match self.fetch_region(region).await {
                Ok(Some(reading)) => {
                    info!(
                        "Fetched {}: {} {}~{}",
                        reading.name, reading.condition, reading.low, reading.high
                    );
                    readings.push(reading);
                }
                Ok(None) => warn!(region, "Weather report incomplete; skipping region"),
                Err(e) => error!(region, error = %e, "Weather fetch failed; skipping region"),
            }
        }

        if readings.is_empty() {
            warn!("No weather readings collected; nothing to post");
            return readings;
        }

        let city = target.unwrap_or(DEFAULT_CITY);
        if let Err(e) = self.post(city, &readings).await {
            error!(error = %e, "Posting weather to backend failed");
        }
        readings
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_region(&self, region: &str) -> Result<Option<WeatherReading>> {
        let url = format!("{}/{}", self.source_base, urlencoding::encode(region));
        let report: WttrReport = self
            .client
            .get(&url)
            .query(&[("format", "j1"), ("lang", "zh")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reading_from(region, &report))
    }

    #[instrument(level = "info", skip(self, readings), fields(count = readings.len()))]
    async fn post(&self, city: &str, readings: &[WeatherReading]) -> Result<()> {
        let resp = self
            .client
            .post(&self.backend_url)
            .query(&[("city", city)])
            .timeout(BACKEND_TIMEOUT)
            .json(readings)
            .send()
            .await?;
        info!(status = resp.status().as_u16(), "Posted weather to backend");
        Ok(())
    }
}
