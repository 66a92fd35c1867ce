pub mod firebase;
pub mod mock;

use crate::models::StoredEvent;
use anyhow::Result;
use std::collections::BTreeMap;

/// One full point-in-time copy of the remote collection, keyed by the
/// store-assigned record id.
pub type Snapshot = BTreeMap<String, StoredEvent>;

/// Long-lived change feed for one subscription. `next` resolves whenever the
/// collection may have changed; it is a hint to refetch, never a delta.
#[async_trait::async_trait]
pub trait ChangeFeed: Send {
    async fn next(&mut self) -> Result<()>;
}

/// Store trait: the minimal set of operations the sync adapter and planner
/// need. Implementations: firebase::FirebaseStore and mock::MockStore.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch the entire collection as it exists right now.
    async fn fetch_snapshot(&self) -> Result<Snapshot>;

    /// Create a record; the store assigns and returns its id.
    async fn create_event(&self, record: &StoredEvent) -> Result<String>;

    /// Replace the stored fields of an existing record (same id).
    async fn update_event(&self, id: &str, record: &StoredEvent) -> Result<()>;

    /// Replace only the image list of an existing record.
    async fn update_images(&self, id: &str, images: &[String]) -> Result<()>;

    /// Remove a record.
    async fn delete_event(&self, id: &str) -> Result<()>;

    /// Open a change feed over the whole collection.
    async fn changes(&self) -> Result<Box<dyn ChangeFeed>>;

    /// Store name (for logging, UI, etc).
    fn name(&self) -> &str;
}
