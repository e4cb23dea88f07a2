//! Now/next metadata for both channels
//!
//! The live endpoint returns a document shaped like
//!
//! ```json
//! { "results": { "channel1": { "now": {..}, "next": {..} }, "channel2": {..} } }
//! ```
//!
//! where each programme carries `broadcast_title` (or `title`) and an image
//! under `embeds.details.media`. The snapshot is replaced wholesale on every
//! successful fetch and left alone when a fetch fails.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Current and upcoming programme of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelNowNext {
    pub now_title: Option<String>,
    pub now_image: Option<String>,
    pub next_title: Option<String>,
    pub next_image: Option<String>,
}

/// Last successfully fetched metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    pub ch1: Option<ChannelNowNext>,
    pub ch2: Option<ChannelNowNext>,
    /// Unix seconds of the fetch
    pub fetched_at: Option<u64>,
}

pub type SharedNowPlaying = Arc<RwLock<NowPlaying>>;

/// Null, `false`, zero and empty strings or arrays.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

/// Looks up `key`, treating a missing or empty value as an empty object.
fn child_object<'a>(parent: &'a Map<String, Value>, key: &str) -> Result<Option<&'a Map<String, Value>>> {
    match parent.get(key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(value) if is_empty_value(value) => Ok(None),
        Some(other) => Err(Error::malformed(format!("`{key}` is not an object: {other}"))),
    }
}

fn non_empty_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn title(programme: Option<&Map<String, Value>>) -> Option<String> {
    let programme = programme?;
    non_empty_str(programme, "broadcast_title").or_else(|| non_empty_str(programme, "title"))
}

/// Prefers `background_large`, falls back to `background`.
fn image(programme: Option<&Map<String, Value>>) -> Result<Option<String>> {
    let Some(programme) = programme else {
        return Ok(None);
    };
    let Some(embeds) = child_object(programme, "embeds")? else {
        return Ok(None);
    };
    let Some(details) = child_object(embeds, "details")? else {
        return Ok(None);
    };
    let Some(media) = child_object(details, "media")? else {
        return Ok(None);
    };
    Ok(non_empty_str(media, "background_large").or_else(|| non_empty_str(media, "background")))
}

fn extract_channel(results: Option<&Map<String, Value>>, key: &str) -> Result<ChannelNowNext> {
    let channel = match results {
        Some(results) => child_object(results, key)?,
        None => None,
    };
    let (now, next) = match channel {
        Some(channel) => (child_object(channel, "now")?, child_object(channel, "next")?),
        None => (None, None),
    };

    Ok(ChannelNowNext {
        now_title: title(now),
        now_image: image(now)?,
        next_title: title(next),
        next_image: image(next)?,
    })
}

/// Builds a snapshot from a live document.
pub fn parse_live(doc: &Value, fetched_at: u64) -> Result<NowPlaying> {
    let root = doc
        .as_object()
        .ok_or_else(|| Error::malformed("document root is not an object"))?;
    let results = child_object(root, "results")?;

    Ok(NowPlaying {
        ch1: Some(extract_channel(results, "channel1")?),
        ch2: Some(extract_channel(results, "channel2")?),
        fetched_at: Some(fetched_at),
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Fetches the live endpoint.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl MetadataClient {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            http,
            url: url.into(),
            timeout,
        })
    }

    pub async fn fetch(&self) -> Result<NowPlaying> {
        let doc: Value = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_live(&doc, unix_now())
    }

    /// Replaces the snapshot on success; leaves it untouched on failure.
    pub async fn refresh(&self, snapshot: &SharedNowPlaying) -> bool {
        match self.fetch().await {
            Ok(fresh) => {
                *snapshot.write().await = fresh;
                trace!("metadata refreshed");
                true
            }
            Err(e) => {
                debug!(url = %self.url, "metadata fetch failed: {}", e);
                false
            }
        }
    }
}

/// Refreshes the snapshot every `interval` until `cancel` fires.
pub async fn run(
    client: MetadataClient,
    snapshot: SharedNowPlaying,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        client.refresh(&snapshot).await;
    }
}
