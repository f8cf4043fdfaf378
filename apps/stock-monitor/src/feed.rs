use crate::config::Config;
use crate::error::CycleError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

/// One reading exactly as the channel returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: String,
    pub value: RawValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Missing,
}

impl RawValue {
    fn from_json(value: Option<&JsonValue>) -> Self {
        match value {
            Some(JsonValue::String(text)) => RawValue::Text(text.clone()),
            Some(JsonValue::Number(number)) => number
                .as_f64()
                .map(RawValue::Number)
                .unwrap_or(RawValue::Missing),
            _ => RawValue::Missing,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    #[serde(default)]
    feeds: Option<Vec<JsonValue>>,
}

#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    url: Url,
    value_key: String,
}

impl FeedClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .context("failed to build feed HTTP client")?;
        Ok(Self {
            client,
            url: feed_url(config)?,
            value_key: value_key(config.field_index),
        })
    }

    pub async fn fetch(&self) -> Result<Vec<RawSample>, CycleError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        parse_feed_body(&body, &self.value_key)
    }
}

/// `{base}/channels/{id}/fields/{n}.json?api_key=..&results=..`; the key is
/// left out entirely for public channels.
pub fn feed_url(config: &Config) -> Result<Url> {
    let base = config.base_url.trim().trim_end_matches('/');
    let raw = format!(
        "{base}/channels/{}/fields/{}.json",
        config.channel_id.trim(),
        config.field_index
    );
    let mut url = Url::parse(&raw).with_context(|| format!("invalid feed url {raw}"))?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(key) = config.read_api_key.as_deref() {
            query.append_pair("api_key", key);
        }
        query.append_pair("results", &config.results.to_string());
    }
    Ok(url)
}

fn value_key(field_index: u32) -> String {
    format!("field{field_index}")
}

pub fn parse_feed_body(body: &[u8], value_key: &str) -> Result<Vec<RawSample>, CycleError> {
    let envelope: FeedEnvelope = serde_json::from_slice(body)
        .map_err(|err| CycleError::MalformedResponse(err.to_string()))?;
    let feeds = envelope
        .feeds
        .ok_or_else(|| CycleError::MalformedResponse("response has no feeds".to_string()))?;

    Ok(feeds
        .iter()
        .map(|entry| RawSample {
            timestamp: entry
                .get("created_at")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
            value: RawValue::from_json(entry.get(value_key)),
        })
        .collect())
}
