//! HTTP fetch primitive shared by feed indexing and article fetching.

use crate::errors::{CrawlError, Result};
use crate::models::RawPage;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// User agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// Build the long-lived HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Fetch `url` and return its undecoded body.
///
/// Anything but `200 OK` is an error.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_page(client: &Client, url: &str) -> Result<RawPage> {
    let resp = client.get(Url::parse(url)?).send().await?;
    let status = resp.status();
    if status != StatusCode::OK {
        return Err(CrawlError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = resp.url().to_string();
    let claimed_encoding = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_from_content_type);
    let bytes = resp.bytes().await?.to_vec();

    debug!(bytes = bytes.len(), %final_url, claimed = ?claimed_encoding, "Fetched page");
    Ok(RawPage {
        bytes,
        claimed_encoding,
        final_url,
    })
}

/// The `charset` parameter of a `Content-Type` value, if any.
pub fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| val.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}
