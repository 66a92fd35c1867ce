use super::{ChangeFeed, EventStore, Snapshot};
use crate::models::StoredEvent;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::info;

/// A simple in-memory store used in tests and when no real backend is
/// configured. Every mutation bumps a version counter that drives the change
/// feed, mirroring how the real backend notifies subscribers.
pub struct MockStore {
    records: Mutex<Snapshot>,
    version: watch::Sender<u64>,
    offline: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            records: Mutex::new(Snapshot::new()),
            version,
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate connectivity loss: all store calls fail until cleared.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fire the change feed without mutating any record.
    pub fn touch(&self) {
        self.bump();
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("mock store offline"));
        }
        Ok(())
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

struct MockFeed {
    version: watch::Receiver<u64>,
}

#[async_trait]
impl ChangeFeed for MockFeed {
    async fn next(&mut self) -> Result<()> {
        self.version
            .changed()
            .await
            .map_err(|_| anyhow!("mock store dropped"))
    }
}

#[async_trait]
impl EventStore for MockStore {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        self.check_online()?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create_event(&self, record: &StoredEvent) -> Result<String> {
        self.check_online()?;
        let id = format!("mock-{}", uuid::Uuid::new_v4());
        info!("MockStore: create_event {} ({})", id, record.title);
        self.records.lock().unwrap().insert(id.clone(), record.clone());
        self.bump();
        Ok(id)
    }

    async fn update_event(&self, id: &str, record: &StoredEvent) -> Result<()> {
        self.check_online()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(id) {
            Some(existing) => {
                *existing = record.clone();
            }
            None => return Err(anyhow!("no such record {}", id)),
        }
        drop(records);
        info!("MockStore: update_event {}", id);
        self.bump();
        Ok(())
    }

    async fn update_images(&self, id: &str, images: &[String]) -> Result<()> {
        self.check_online()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(id) {
            Some(existing) => {
                existing.images = images.to_vec();
            }
            None => return Err(anyhow!("no such record {}", id)),
        }
        drop(records);
        info!("MockStore: update_images {} -> {} images", id, images.len());
        self.bump();
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        self.check_online()?;
        self.records.lock().unwrap().remove(id);
        info!("MockStore: delete_event {}", id);
        self.bump();
        Ok(())
    }

    async fn changes(&self) -> Result<Box<dyn ChangeFeed>> {
        self.check_online()?;
        Ok(Box::new(MockFeed { version: self.version.subscribe() }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
