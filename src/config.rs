use crate::ingest::IngestLimits;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the realtime database, e.g.
    /// "https://example-default-rtdb.firebasedatabase.app".
    pub database_url: String,

    /// Collection (top-level path) holding the plan records.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Optional database auth token, appended as ?auth=... to every request.
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Base delay before the sync adapter reconnects after a transport error.
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_sec: u64,

    // Image ingestion bounds. Uploaded photos are scaled down to fit and
    // re-encoded; see ingest::IngestLimits for the retry policy.
    #[serde(default = "default_image_max_width")]
    pub image_max_width: u32,
    #[serde(default = "default_image_max_height")]
    pub image_max_height: u32,
    #[serde(default = "default_image_max_encoded_bytes")]
    pub image_max_encoded_bytes: usize,
    #[serde(default = "default_image_quality")]
    pub image_quality: u8,
    #[serde(default = "default_image_retry_quality")]
    pub image_retry_quality: u8,
}

fn default_collection() -> String { "events".into() }
fn default_log_dir() -> PathBuf { "/var/log/date-calendar-sync".into() }
fn default_reconnect_backoff() -> u64 { 2000 }
fn default_request_timeout() -> u64 { 30 }
fn default_image_max_width() -> u32 { 800 }
fn default_image_max_height() -> u32 { 600 }
fn default_image_max_encoded_bytes() -> usize { 500_000 }
fn default_image_quality() -> u8 { 80 }
fn default_image_retry_quality() -> u8 { 60 }

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    pub fn ingest_limits(&self) -> IngestLimits {
        IngestLimits {
            max_width: self.image_max_width,
            max_height: self.image_max_height,
            max_encoded_bytes: self.image_max_encoded_bytes,
            quality: self.image_quality,
            retry_quality: self.image_retry_quality,
        }
    }
}
