use super::{ChangeFeed, EventStore, Snapshot};
use crate::config::Config;
use crate::models::StoredEvent;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

/// Realtime-database store backed by the Firebase REST surface.
///
/// Records live under `<base>/<collection>/<id>.json`; creation is a POST to
/// the collection (the database assigns the push id), updates are PATCH,
/// deletion is DELETE. The change feed uses the `text/event-stream`
/// streaming endpoint. The base URL may be overridden by the
/// FIREBASE_DB_BASE env var (useful for tests).
pub struct FirebaseStore {
    client: Client,
    stream_client: Client,
    base: String,
    collection: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseStore {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.database_url,
            &cfg.collection,
            cfg.auth_token.clone(),
            Duration::from_secs(cfg.request_timeout_sec),
        )
    }

    pub fn new(
        base: &str,
        collection: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        // The streaming connection stays open indefinitely, so it gets a
        // client without a request timeout.
        let stream_client = Client::builder().build().context("building stream client")?;
        Ok(Self {
            client,
            stream_client,
            base: base.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            auth_token,
        })
    }

    fn base(&self) -> String {
        env::var("FIREBASE_DB_BASE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.base.clone())
    }

    fn url_for(&self, path: &str) -> Result<String> {
        let mut url = url::Url::parse(&format!("{}/{}.json", self.base(), path))
            .context("building store url")?;
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url.into())
    }

    fn collection_url(&self) -> Result<String> {
        self.url_for(&self.collection)
    }

    fn record_url(&self, id: &str) -> Result<String> {
        self.url_for(&format!("{}/{}", self.collection, urlencoding::encode(id)))
    }
}

async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let txt = resp.text().await.unwrap_or_default();
    Err(anyhow!("{} failed: {} => {}", what, status, txt))
}

#[async_trait]
impl EventStore for FirebaseStore {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let resp = self.client.get(self.collection_url()?).send().await?;
        let resp = check(resp, "fetch snapshot").await?;
        // The collection path decodes to null when empty.
        let raw: Option<BTreeMap<String, serde_json::Value>> = resp.json().await?;
        let mut snapshot = Snapshot::new();
        for (id, value) in raw.unwrap_or_default() {
            match serde_json::from_value::<StoredEvent>(value) {
                Ok(rec) => {
                    snapshot.insert(id, rec);
                }
                Err(e) => warn!("skipping malformed record {}: {}", id, e),
            }
        }
        Ok(snapshot)
    }

    async fn create_event(&self, record: &StoredEvent) -> Result<String> {
        let resp = self
            .client
            .post(self.collection_url()?)
            .json(record)
            .send()
            .await?;
        let resp = check(resp, "create event").await?;
        let push: PushResponse = resp.json().await?;
        Ok(push.name)
    }

    async fn update_event(&self, id: &str, record: &StoredEvent) -> Result<()> {
        let resp = self
            .client
            .patch(self.record_url(id)?)
            .json(record)
            .send()
            .await?;
        check(resp, "update event").await?;
        Ok(())
    }

    async fn update_images(&self, id: &str, images: &[String]) -> Result<()> {
        let resp = self
            .client
            .patch(self.record_url(id)?)
            .json(&json!({ "images": images }))
            .send()
            .await?;
        check(resp, "update images").await?;
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let resp = self.client.delete(self.record_url(id)?).send().await?;
        check(resp, "delete event").await?;
        Ok(())
    }

    async fn changes(&self) -> Result<Box<dyn ChangeFeed>> {
        let resp = self
            .stream_client
            .get(self.collection_url()?)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = check(resp, "open change stream").await?;
        let chunks = resp
            .bytes_stream()
            .map(|r| r.map(|b| b.to_vec()))
            .boxed();
        Ok(Box::new(FirebaseFeed { chunks, buf: Vec::new() }))
    }

    fn name(&self) -> &str {
        "firebase"
    }
}

/// Server-sent-events reader over the streaming endpoint. Only event names
/// matter: `put`/`patch` mean "refetch", payload deltas are ignored so the
/// adapter always works from a full snapshot.
struct FirebaseFeed {
    chunks: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    buf: Vec<u8>,
}

/// Drain one complete SSE block (terminated by a blank line) from the
/// buffer, if present.
fn take_block(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.windows(2).position(|w| w == b"\n\n")?;
    let block: Vec<u8> = buf.drain(..pos + 2).collect();
    Some(String::from_utf8_lossy(&block).into_owned())
}

fn event_name(block: &str) -> Option<String> {
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            return Some(rest.trim().to_string());
        }
    }
    None
}

#[async_trait]
impl ChangeFeed for FirebaseFeed {
    async fn next(&mut self) -> Result<()> {
        loop {
            while let Some(block) = take_block(&mut self.buf) {
                match event_name(&block).as_deref() {
                    Some("put") | Some("patch") => return Ok(()),
                    Some("keep-alive") | None => continue,
                    Some("cancel") => return Err(anyhow!("change stream cancelled by server")),
                    Some("auth_revoked") => return Err(anyhow!("change stream auth revoked")),
                    Some(other) => {
                        debug!("ignoring stream event {}", other);
                        continue;
                    }
                }
            }
            match self.chunks.next().await {
                Some(Ok(bytes)) => self.buf.extend_from_slice(&bytes),
                Some(Err(e)) => return Err(anyhow!("change stream error: {}", e)),
                None => return Err(anyhow!("change stream closed")),
            }
        }
    }
}
